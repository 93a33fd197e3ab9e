/// Union-find over `0..n` with path halving and union by size.
#[derive(Clone, Debug)]
pub(crate) struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    pub fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let (mut a, mut b) = (self.find(a), self.find(b));
        if a == b {
            return;
        }
        if self.size[a] < self.size[b] {
            std::mem::swap(&mut a, &mut b);
        }
        self.parent[b] = a;
        self.size[a] += self.size[b];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_is_transitive() {
        let mut set = DisjointSet::new(6);
        set.union(0, 3);
        set.union(3, 5);
        set.union(1, 2);
        assert_eq!(set.find(0), set.find(5));
        assert_eq!(set.find(1), set.find(2));
        assert_ne!(set.find(0), set.find(1));
        assert_eq!(set.find(4), 4);
    }
}
