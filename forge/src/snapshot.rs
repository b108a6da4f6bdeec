/// Whole-state snapshot held for the duration of one operation.
///
/// The state is restored when the guard is dropped without a successful
/// [`SnapshotGuard::commit`], so an early return through `?` discards every
/// write the operation made.
pub struct SnapshotGuard<'a, T: Clone> {
    state: &'a mut T,
    backup: Option<T>,
}

impl<'a, T: Clone> SnapshotGuard<'a, T> {
    pub fn new(state: &'a mut T) -> Self {
        let backup = Some(state.clone());
        Self { state, backup }
    }

    pub fn state_mut(&mut self) -> &mut T {
        self.state
    }

    pub fn has_snapshot(&self) -> bool {
        self.backup.is_some()
    }

    pub fn commit(mut self) {
        self.backup = None;
    }

    pub fn rollback(&mut self) {
        if let Some(backup) = self.backup.take() {
            *self.state = backup;
        }
    }
}

impl<T: Clone> Drop for SnapshotGuard<'_, T> {
    fn drop(&mut self) {
        // Restore if still active and not committed
        if self.has_snapshot() {
            self.rollback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(value: u32) -> Result<(), &'static str> {
        if value > 3 {
            return Err("boom");
        }
        Ok(())
    }

    fn failing_op(state: &mut Vec<u32>) -> Result<(), &'static str> {
        let mut guard = SnapshotGuard::new(state);
        guard.state_mut().push(4);
        check(guard.state_mut().len() as u32)?;
        guard.commit();
        Ok(())
    }

    #[test]
    fn test_commit_keeps_writes() {
        let mut state = vec![1, 2, 3];
        let mut guard = SnapshotGuard::new(&mut state);
        guard.state_mut().push(4);
        guard.commit();
        assert_eq!(state, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_drop_restores_state() {
        let mut state = vec![1, 2, 3];
        assert!(failing_op(&mut state).is_err());
        assert_eq!(state, vec![1, 2, 3]);
    }

    #[test]
    fn test_explicit_rollback() {
        let mut state = vec![1];
        let mut guard = SnapshotGuard::new(&mut state);
        guard.state_mut().clear();
        guard.rollback();
        assert!(!guard.has_snapshot());
        drop(guard);
        assert_eq!(state, vec![1]);
    }
}
