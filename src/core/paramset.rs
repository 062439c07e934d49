//! Bundle up named construction parameters and their values in a
//! generic way.
//!
//! ```rust
//! use rs_sbvh::core::paramset::ParamSet;
//!
//!     let mut ps = ParamSet::default();
//!     ps.add_string(String::from("splitmethod"), String::from("binned"));
//!     ps.add_int(String::from("maxnodeprims"), 8);
//!     assert_eq!(ps.find_one_int("maxnodeprims", 64), 8);
//!     assert_eq!(ps.find_one_float("optimizebatch", 0.01), 0.01);
//! ```

// std
use std::cell::Cell;
// others
use log::warn;
// pbrt
use crate::core::pbrt::Float;

#[derive(Debug, Clone)]
pub struct ParamSetItem<T> {
    pub name: String,
    pub values: Vec<T>,
    pub n_values: usize,
    pub looked_up: Cell<bool>,
}

impl<T> ParamSetItem<T> {
    fn new(name: String, values: Vec<T>) -> Self {
        let n_values: usize = values.len();
        ParamSetItem {
            name,
            values,
            n_values,
            looked_up: Cell::new(false),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ParamSet {
    pub ints: Vec<ParamSetItem<i32>>,
    pub floats: Vec<ParamSetItem<Float>>,
    pub strings: Vec<ParamSetItem<String>>,
}

impl ParamSet {
    pub fn add_float(&mut self, name: String, value: Float) {
        self.erase(&name);
        self.floats.push(ParamSetItem::new(name, vec![value]));
    }
    pub fn add_int(&mut self, name: String, value: i32) {
        self.erase(&name);
        self.ints.push(ParamSetItem::new(name, vec![value]));
    }
    pub fn add_string(&mut self, name: String, value: String) {
        self.erase(&name);
        self.strings.push(ParamSetItem::new(name, vec![value]));
    }
    /// Drop any earlier value stored under *name*, whatever its type.
    fn erase(&mut self, name: &str) {
        self.ints.retain(|v| v.name != name);
        self.floats.retain(|v| v.name != name);
        self.strings.retain(|v| v.name != name);
    }
    pub fn find_one_float(&self, name: &str, d: Float) -> Float {
        lookup_one(&self.floats, name, d)
    }
    pub fn find_one_int(&self, name: &str, d: i32) -> i32 {
        lookup_one(&self.ints, name, d)
    }
    pub fn find_one_string(&self, name: &str, d: String) -> String {
        lookup_one(&self.strings, name, d)
    }
    /// Names of parameters nobody asked for, in insertion order per
    /// type.
    pub fn unused(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        collect_unused(&self.ints, &mut names);
        collect_unused(&self.floats, &mut names);
        collect_unused(&self.strings, &mut names);
        names
    }
    pub fn report_unused(&self) {
        for name in self.unused() {
            warn!("parameter {:?} not used", name);
        }
    }
}

fn collect_unused<T>(vec: &[ParamSetItem<T>], names: &mut Vec<String>) {
    for v in vec {
        if !v.looked_up.get() {
            names.push(v.name.clone());
        }
    }
}

/// Return the single value stored under *name* or the default *d*.
pub fn lookup_one<T>(vec: &[ParamSetItem<T>], name: &str, d: T) -> T
where
    T: Clone,
{
    for v in vec {
        if v.name == name && v.n_values == 1_usize {
            v.looked_up.set(true);
            return v.values[0].clone();
        }
    }
    d
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_when_missing() {
        let ps = ParamSet::default();
        assert_eq!(ps.find_one_int("maxnodeprims", 64), 64);
        assert_eq!(
            ps.find_one_string("splitmethod", String::from("sbvh")),
            "sbvh"
        );
    }

    #[test]
    fn later_values_replace_earlier_ones() {
        let mut ps = ParamSet::default();
        ps.add_int(String::from("seed"), 1);
        ps.add_int(String::from("seed"), 2);
        assert_eq!(ps.ints.len(), 1);
        assert_eq!(ps.find_one_int("seed", 0), 2);
    }

    #[test]
    fn tracks_unused_parameters() {
        let mut ps = ParamSet::default();
        ps.add_float(String::from("optimizebatch"), 0.05);
        ps.add_string(String::from("splitmetod"), String::from("sah"));
        assert_eq!(ps.find_one_float("optimizebatch", 0.01), 0.05);
        assert_eq!(ps.unused(), vec![String::from("splitmetod")]);
    }
}
