//! A queue of image tiles shared by the render threads. The tiles are
//! sorted along a Morton curve once; afterwards the queue is only read,
//! with an atomic counter handing out the next tile.

use std::sync::atomic::{AtomicUsize, Ordering};
// others
use log::warn;

pub struct BlockQueue {
    /// tile coordinates, in Morton order
    blocks: Vec<(u32, u32)>,
    /// tile size in pixels
    dimensions: (u32, u32),
    /// image size in pixels
    image: (u32, u32),
    /// index of the next tile to hand out
    next: AtomicUsize,
}

impl BlockQueue {
    /// Cover an image of size *img* with tiles of size *dim*. Tiles on
    /// the right and bottom border may be cut off by the image.
    pub fn new(img: (u32, u32), dim: (u32, u32)) -> BlockQueue {
        assert!(dim.0 > 0 && dim.1 > 0, "tiles of size {:?}", dim);
        let num_blocks = (
            (img.0 + dim.0 - 1) / dim.0,
            (img.1 + dim.1 - 1) / dim.1,
        );
        let mut blocks: Vec<(u32, u32)> = (0..num_blocks.0 * num_blocks.1)
            .map(|i| (i % num_blocks.0, i / num_blocks.0))
            .collect();
        blocks.sort_by_key(|b| morton2(*b));
        if blocks.is_empty() {
            warn!("block queue for image {:?} is empty", img);
        }
        BlockQueue {
            blocks,
            dimensions: dim,
            image: img,
            next: AtomicUsize::new(0),
        }
    }
    /// Pixel range `[x0, x1) x [y0, y1)` of the tile at *block*.
    pub fn block_bounds(&self, block: (u32, u32)) -> ((u32, u32), (u32, u32)) {
        let x0: u32 = block.0 * self.dimensions.0;
        let y0: u32 = block.1 * self.dimensions.1;
        let x1: u32 = std::cmp::min(x0 + self.dimensions.0, self.image.0);
        let y1: u32 = std::cmp::min(y0 + self.dimensions.1, self.image.1);
        ((x0, y0), (x1, y1))
    }
    pub fn iter(&self) -> BlockQueueIterator {
        BlockQueueIterator { queue: self }
    }
    /// Next tile, or `None` once every tile has been handed out.
    pub fn next(&self) -> Option<(u32, u32)> {
        let i = self.next.fetch_add(1, Ordering::AcqRel);
        self.blocks.get(i).copied()
    }
    pub fn len(&self) -> usize {
        self.blocks.len()
    }
    pub fn is_empty(&self) -> bool {
        self.next.load(Ordering::Acquire) >= self.blocks.len()
    }
}

pub struct BlockQueueIterator<'a> {
    queue: &'a BlockQueue,
}

impl<'a> Iterator for BlockQueueIterator<'a> {
    type Item = (u32, u32);
    fn next(&mut self) -> Option<(u32, u32)> {
        self.queue.next()
    }
}

/// Insert a 0 bit between each of the low 16 bits of x
fn part1_by1(mut x: u32) -> u32 {
    // x = ---- ---- ---- ---- fedc ba98 7654 3210
    x &= 0x0000_ffff;
    // x = ---- ---- fedc ba98 ---- ---- 7654 3210
    x = (x ^ (x << 8)) & 0x00ff_00ff;
    // x = ---- fedc ---- ba98 ---- 7654 ---- 3210
    x = (x ^ (x << 4)) & 0x0f0f_0f0f;
    // x = --fe --dc --ba --98 --76 --54 --32 --10
    x = (x ^ (x << 2)) & 0x3333_3333;
    // x = -f-e -d-c -b-a -9-8 -7-6 -5-4 -3-2 -1-0
    (x ^ (x << 1)) & 0x5555_5555
}

fn morton2(p: (u32, u32)) -> u32 {
    (part1_by1(p.1) << 1) + part1_by1(p.0)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn uneven_image_is_covered_once() {
        let bq = BlockQueue::new((50, 20), (16, 16));
        assert_eq!(bq.len(), 4 * 2);
        let mut covered = vec![0_u32; 50 * 20];
        for block in bq.iter() {
            let ((x0, y0), (x1, y1)) = bq.block_bounds(block);
            assert!(x1 <= 50 && y1 <= 20);
            for y in y0..y1 {
                for x in x0..x1 {
                    covered[(y * 50 + x) as usize] += 1;
                }
            }
        }
        assert!(covered.iter().all(|&c| c == 1));
        assert!(bq.is_empty());
        assert_eq!(bq.next(), None);
    }

    #[test]
    fn morton_order() {
        let bq = BlockQueue::new((32, 32), (16, 16));
        let order: Vec<(u32, u32)> = bq.iter().collect();
        assert_eq!(order, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    }
}
