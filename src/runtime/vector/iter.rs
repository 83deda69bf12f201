use std::iter::FusedIterator;

use crate::runtime::{
    host::Host,
    vector::{Vector, kind::ElementKind},
};

/// Forward iterator over the logical elements of a [`Vector`].
///
/// Values come from the kind's decode buffer when it fills one, otherwise
/// straight from the backing store.
pub struct Iter<'a, 'h, H: Host + ?Sized, K: ElementKind> {
    vector: &'a Vector<'h, H, K>,
    pos: usize,
    end: usize,
    buf: Vec<K::Elem>,
    buf_start: usize,
}

impl<'a, 'h, H: Host + ?Sized, K: ElementKind> Iter<'a, 'h, H, K> {
    pub(crate) fn new(vector: &'a Vector<'h, H, K>) -> Self {
        Self {
            vector,
            pos: 0,
            end: vector.len(),
            buf: Vec::new(),
            buf_start: 0,
        }
    }

    fn slot(&mut self, pos: usize) -> K::Elem {
        let offset = pos - self.buf_start;
        if offset < self.buf.len() {
            return self.buf[offset];
        }

        let host = self.vector.host();
        let data = self.vector.data();
        self.buf.clear();
        self.buf_start = pos;
        K::fill_buf(host, data, pos, self.end, &mut self.buf);
        match self.buf.first() {
            Some(value) => *value,
            None => K::read(host, data, pos),
        }
    }
}

impl<H: Host + ?Sized, K: ElementKind> Iterator for Iter<'_, '_, H, K> {
    type Item = K::Elem;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.end {
            return None;
        }
        let value = self.slot(self.pos);
        self.pos += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.pos;
        (remaining, Some(remaining))
    }
}

impl<H: Host + ?Sized, K: ElementKind> ExactSizeIterator for Iter<'_, '_, H, K> {}

impl<H: Host + ?Sized, K: ElementKind> FusedIterator for Iter<'_, '_, H, K> {}

impl<'a, 'h, H: Host + ?Sized, K: ElementKind> IntoIterator for &'a Vector<'h, H, K> {
    type Item = K::Elem;
    type IntoIter = Iter<'a, 'h, H, K>;

    fn into_iter(self) -> Self::IntoIter {
        Iter::new(self)
    }
}
