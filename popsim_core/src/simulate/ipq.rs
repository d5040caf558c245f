//! Indexed priority queue of putative reaction times
//!
//! A binary min-heap of `(reaction, time)` nodes plus a `reaction -> heap position` map, so a
//! reaction's time can be changed in O(log R) without searching for it.

/// A node of the heap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub reaction: usize,
    pub time: f64,
}

#[derive(Debug, Clone)]
pub struct IndexedPriorityQueue {
    heap: Vec<Node>,
    /// `positions[reaction]` is the index of that reaction's node in `heap`
    positions: Vec<usize>,
}

/// NaN can't be ordered, a 0/0 putative time means the reaction never fires
#[inline]
fn normalize(time: f64) -> f64 {
    if time.is_nan() {
        f64::INFINITY
    } else {
        time
    }
}

impl IndexedPriorityQueue {
    /// Build the queue, reaction `i` gets `times[i]`
    pub fn new(times: &[f64]) -> Self {
        let heap = times
            .iter()
            .enumerate()
            .map(|(reaction, time)| Node {
                reaction,
                time: normalize(*time),
            })
            .collect();
        let positions = (0..times.len()).collect();
        let mut queue = IndexedPriorityQueue { heap, positions };
        for node in (0..queue.heap.len() / 2).rev() {
            queue.sift_down(node);
        }
        queue
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// The reaction with the smallest time, and that time
    #[inline]
    pub fn peek(&self) -> Option<(usize, f64)> {
        self.heap.first().map(|node| (node.reaction, node.time))
    }

    /// Current time stored for `reaction`
    #[inline]
    pub fn time_of(&self, reaction: usize) -> f64 {
        self.heap[self.positions[reaction]].time
    }

    /// Change the time of `reaction` and restore the heap order
    pub fn update(&mut self, reaction: usize, time: f64) {
        let node = self.positions[reaction];
        self.heap[node].time = normalize(time);
        if node > 0 && self.heap[node].time < self.heap[(node - 1) / 2].time {
            self.sift_up(node);
        } else {
            self.sift_down(node);
        }
    }

    /// Check that every parent is no later than its children, and that the position map agrees
    /// with the heap
    pub fn is_valid(&self) -> bool {
        let ordered = (1..self.heap.len()).all(|i| self.heap[(i - 1) / 2].time <= self.heap[i].time);
        let indexed = self
            .heap
            .iter()
            .enumerate()
            .all(|(i, node)| self.positions[node.reaction] == i);
        ordered && indexed
    }

    /// Nodes in heap order
    pub fn nodes(&self) -> &[Node] {
        &self.heap
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.positions[self.heap[i].reaction] = i;
        self.positions[self.heap[j].reaction] = j;
    }

    fn sift_up(&mut self, mut node: usize) {
        while node > 0 {
            let parent = (node - 1) / 2;
            if self.heap[node].time < self.heap[parent].time {
                self.swap(node, parent);
                node = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut node: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * node + 1;
            let right = left + 1;
            let mut smallest = node;
            if left < len && self.heap[left].time < self.heap[smallest].time {
                smallest = left;
            }
            if right < len && self.heap[right].time < self.heap[smallest].time {
                smallest = right;
            }
            if smallest == node {
                break;
            }
            self.swap(node, smallest);
            node = smallest;
        }
    }
}
