use crate::types::{wrap_index, Category, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReelPhase {
    Idle,
    Animating,
}

/// Selection and animation lock for one reel.
///
/// The index moves when an animation starts, not when it ends. `Animating`
/// is the lock: while set, nothing else may rotate this reel.
#[derive(Debug, Clone)]
pub struct ReelState {
    pub category: Category,
    index: usize,
    len: usize,
    phase: ReelPhase,
}

impl ReelState {
    pub fn new(category: Category, len: usize) -> Self {
        debug_assert!(len > 0, "reel {} has no values", category);
        Self {
            category,
            index: 0,
            len,
            phase: ReelPhase::Idle,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn phase(&self) -> ReelPhase {
        self.phase
    }

    pub fn is_animating(&self) -> bool {
        self.phase == ReelPhase::Animating
    }

    /// Idle → Animating. Returns false (and changes nothing) if already animating.
    pub fn lock(&mut self) -> bool {
        if self.is_animating() {
            return false;
        }
        self.phase = ReelPhase::Animating;
        true
    }

    pub fn unlock(&mut self) {
        self.phase = ReelPhase::Idle;
    }

    /// Move one card in `direction`, wrapping around.
    pub fn advance(&mut self, direction: Direction) -> usize {
        self.index = wrap_index(self.index, direction.step(), self.len);
        self.index
    }

    /// Jump straight to `index` (lever runs).
    pub fn set_index(&mut self, index: usize) {
        debug_assert!(
            index < self.len,
            "{} index {} out of range (len {})",
            self.category,
            index,
            self.len
        );
        self.index = index % self.len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_wraps() {
        let mut r = ReelState::new(Category::Vibe, 3);
        assert_eq!(r.advance(Direction::Down), 2);
        assert_eq!(r.advance(Direction::Up), 0);
        assert_eq!(r.advance(Direction::Up), 1);
    }

    #[test]
    fn test_lock_is_exclusive() {
        let mut r = ReelState::new(Category::Key, 4);
        assert!(r.lock());
        assert!(!r.lock());
        assert_eq!(r.phase(), ReelPhase::Animating);
        r.unlock();
        assert!(r.lock());
    }

    #[test]
    fn test_single_value_reel_stays_put() {
        let mut r = ReelState::new(Category::Tempo, 1);
        assert_eq!(r.advance(Direction::Up), 0);
        assert_eq!(r.advance(Direction::Down), 0);
    }
}
