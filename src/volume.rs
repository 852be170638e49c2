use tracing::info;

use crate::cloud::{BlockStorage, ModificationState};
use crate::config::PollSettings;
use crate::error::{Error, Result};
use crate::poll::{poll_until, PollState};

/// Grow `volume_id` from `current_size_gib` by `add_size_gib`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeResizeRequest {
    pub volume_id: String,
    pub current_size_gib: u64,
    pub add_size_gib: u64,
}

impl VolumeResizeRequest {
    pub fn new(volume_id: impl Into<String>, current_size_gib: u64, add_size_gib: u64) -> Self {
        Self {
            volume_id: volume_id.into(),
            current_size_gib,
            add_size_gib,
        }
    }

    pub fn target_size_gib(&self) -> Result<u64> {
        self.current_size_gib
            .checked_add(self.add_size_gib)
            .ok_or_else(|| {
                Error::InvalidSize(format!(
                    "{} GiB + {} GiB overflows",
                    self.current_size_gib, self.add_size_gib
                ))
            })
    }
}

/// Resizes a block volume and waits for the provider to finish
pub struct VolumeGrower<'a> {
    storage: &'a dyn BlockStorage,
    polling: PollSettings,
}

impl<'a> VolumeGrower<'a> {
    pub fn new(storage: &'a dyn BlockStorage, polling: PollSettings) -> Self {
        Self { storage, polling }
    }

    /// Issue the modify request once and wait until it completes
    ///
    /// Returns the new size. A `failed` modification is fatal; an absent
    /// state counts as completed.
    pub fn grow(&self, request: &VolumeResizeRequest) -> Result<u64> {
        let target = request.target_size_gib()?;
        info!(
            "Resizing volume {} from {} GiB to {} GiB...",
            request.volume_id, request.current_size_gib, target
        );
        self.storage.modify_volume(&request.volume_id, target)?;

        self.wait(&request.volume_id)?;

        info!("Volume {} resized to {} GiB", request.volume_id, target);
        Ok(target)
    }

    /// Poll the latest modification of `volume_id` until it is terminal
    ///
    /// Issues no modify request, so it is safe to repeat on a volume whose
    /// modification already finished.
    pub fn wait(&self, volume_id: &str) -> Result<()> {
        let operation = format!("modification of volume {}", volume_id);
        poll_until(&self.polling, &operation, || {
            let modification = self.storage.describe_modification(volume_id)?;
            match modification.state {
                None | Some(ModificationState::Completed) => Ok(PollState::Ready(())),
                Some(ModificationState::Failed) => Err(Error::VolumeModificationFailed {
                    volume_id: volume_id.to_string(),
                    message: modification
                        .status_message
                        .unwrap_or_else(|| "no status message".to_string()),
                }),
                Some(state) => Ok(PollState::Pending(state.to_string())),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::VolumeModification;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::time::Duration;

    struct ScriptedStorage {
        states: RefCell<VecDeque<Option<ModificationState>>>,
        requests: RefCell<Vec<(String, u64)>>,
        describes: RefCell<u32>,
    }

    impl ScriptedStorage {
        fn new(states: &[Option<ModificationState>]) -> Self {
            Self {
                states: RefCell::new(states.iter().copied().collect()),
                requests: RefCell::new(Vec::new()),
                describes: RefCell::new(0),
            }
        }
    }

    impl BlockStorage for ScriptedStorage {
        fn modify_volume(&self, volume_id: &str, size_gib: u64) -> Result<()> {
            self.requests
                .borrow_mut()
                .push((volume_id.to_string(), size_gib));
            Ok(())
        }

        fn describe_modification(&self, _volume_id: &str) -> Result<VolumeModification> {
            *self.describes.borrow_mut() += 1;
            let mut states = self.states.borrow_mut();
            let state = if states.len() > 1 {
                states.pop_front().flatten()
            } else {
                states[0]
            };
            Ok(VolumeModification {
                state,
                status_message: Some("quota exceeded".to_string()),
            })
        }
    }

    fn grower(storage: &ScriptedStorage) -> VolumeGrower<'_> {
        VolumeGrower::new(storage, PollSettings::immediate(Duration::from_secs(30)))
    }

    #[test]
    fn test_target_size() {
        let request = VolumeResizeRequest::new("vol-1", 20, 10);
        assert_eq!(request.target_size_gib().unwrap(), 30);

        let request = VolumeResizeRequest::new("vol-1", u64::MAX, 1);
        assert!(matches!(request.target_size_gib(), Err(Error::InvalidSize(_))));
    }

    #[test]
    fn test_grow_waits_for_completed() {
        let storage = ScriptedStorage::new(&[
            Some(ModificationState::Modifying),
            Some(ModificationState::Optimizing),
            Some(ModificationState::Completed),
        ]);

        let size = grower(&storage)
            .grow(&VolumeResizeRequest::new("vol-1", 20, 10))
            .unwrap();

        assert_eq!(size, 30);
        assert_eq!(storage.requests.borrow().as_slice(), [("vol-1".to_string(), 30)]);
        assert_eq!(*storage.describes.borrow(), 3);
    }

    #[test]
    fn test_absent_state_counts_as_completed() {
        let storage = ScriptedStorage::new(&[Some(ModificationState::Modifying), None]);
        grower(&storage)
            .grow(&VolumeResizeRequest::new("vol-1", 8, 2))
            .unwrap();
        assert_eq!(*storage.describes.borrow(), 2);
    }

    #[test]
    fn test_failed_modification_is_fatal() {
        let storage = ScriptedStorage::new(&[
            Some(ModificationState::Modifying),
            Some(ModificationState::Failed),
        ]);

        match grower(&storage).grow(&VolumeResizeRequest::new("vol-9", 8, 2)) {
            Err(Error::VolumeModificationFailed { volume_id, message }) => {
                assert_eq!(volume_id, "vol-9");
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(storage.requests.borrow().len(), 1);
    }

    #[test]
    fn test_waiting_again_after_completion() {
        let storage = ScriptedStorage::new(&[
            Some(ModificationState::Modifying),
            Some(ModificationState::Completed),
        ]);
        let grower = grower(&storage);

        grower.grow(&VolumeResizeRequest::new("vol-1", 20, 10)).unwrap();
        grower.wait("vol-1").unwrap();
        grower.wait("vol-1").unwrap();

        assert_eq!(storage.requests.borrow().len(), 1);
        assert_eq!(*storage.describes.borrow(), 4);
    }

    #[test]
    fn test_waiting_again_after_failure() {
        let storage = ScriptedStorage::new(&[Some(ModificationState::Failed)]);
        let grower = grower(&storage);

        let first = grower
            .grow(&VolumeResizeRequest::new("vol-1", 20, 10))
            .unwrap_err();
        let again = grower.wait("vol-1").unwrap_err();

        assert_eq!(first.to_string(), again.to_string());
        assert!(matches!(again, Error::VolumeModificationFailed { .. }));
        assert_eq!(storage.requests.borrow().len(), 1);
    }

    #[test]
    fn test_stalled_modification_times_out() {
        let storage = ScriptedStorage::new(&[Some(ModificationState::Optimizing)]);
        let grower = VolumeGrower::new(&storage, PollSettings::immediate(Duration::ZERO));

        let result = grower.grow(&VolumeResizeRequest::new("vol-1", 8, 2));
        assert!(matches!(result, Err(Error::Timeout { .. })));
    }
}
