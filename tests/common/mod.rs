use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use rootexpander::cloud::{
    BlockStorage, Invocation, InvocationStatus, ModificationState, RemoteExecutor,
    VolumeModification,
};
use rootexpander::topology::DISCOVERY_COMMAND;
use rootexpander::Result;

/// Provider calls in the order they were made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Send(String),
    Modify(String, u64),
    Describe(String),
}

/// In-memory stand-in for SSM and EC2
///
/// Every invocation reports `InProgress` once before settling.
pub struct FakeCloud {
    discovery_stdout: String,
    failing_command: Option<String>,
    states: RefCell<VecDeque<Option<ModificationState>>>,
    scripts: RefCell<Vec<String>>,
    polls: RefCell<HashMap<String, u32>>,
    pub events: RefCell<Vec<Event>>,
}

impl FakeCloud {
    pub fn new(discovery_stdout: &str) -> Self {
        Self {
            discovery_stdout: discovery_stdout.to_string(),
            failing_command: None,
            states: RefCell::new(
                [
                    Some(ModificationState::Modifying),
                    Some(ModificationState::Completed),
                ]
                .into_iter()
                .collect(),
            ),
            scripts: RefCell::new(Vec::new()),
            polls: RefCell::new(HashMap::new()),
            events: RefCell::new(Vec::new()),
        }
    }

    pub fn with_states(self, states: &[Option<ModificationState>]) -> Self {
        *self.states.borrow_mut() = states.iter().copied().collect();
        self
    }

    pub fn failing(mut self, command: &str) -> Self {
        self.failing_command = Some(command.to_string());
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Scripts sent to the host, discovery included
    pub fn sent(&self) -> Vec<String> {
        self.scripts.borrow().clone()
    }

    pub fn modify_requests(&self) -> Vec<(String, u64)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Modify(volume, size) => Some((volume, size)),
                _ => None,
            })
            .collect()
    }
}

impl RemoteExecutor for FakeCloud {
    fn send_command(&self, _host_id: &str, script: &str) -> Result<String> {
        self.events.borrow_mut().push(Event::Send(script.to_string()));
        let mut scripts = self.scripts.borrow_mut();
        scripts.push(script.to_string());
        Ok(format!("cmd-{}", scripts.len() - 1))
    }

    fn get_invocation(&self, invocation_id: &str, _host_id: &str) -> Result<Invocation> {
        let index: usize = invocation_id.trim_start_matches("cmd-").parse().unwrap();
        let script = self.scripts.borrow()[index].clone();

        let mut polls = self.polls.borrow_mut();
        let count = polls.entry(invocation_id.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            return Ok(Invocation {
                status: InvocationStatus::InProgress,
                stdout: String::new(),
                stderr: String::new(),
                status_detail: "InProgress".to_string(),
            });
        }

        if self.failing_command.as_deref() == Some(script.as_str()) {
            return Ok(Invocation {
                status: InvocationStatus::Failed,
                stdout: String::new(),
                stderr: "command exited with 1".to_string(),
                status_detail: "Failed".to_string(),
            });
        }

        let stdout = if script == DISCOVERY_COMMAND {
            self.discovery_stdout.clone()
        } else {
            String::new()
        };
        Ok(Invocation {
            status: InvocationStatus::Success,
            stdout,
            stderr: String::new(),
            status_detail: "Success".to_string(),
        })
    }
}

impl BlockStorage for FakeCloud {
    fn modify_volume(&self, volume_id: &str, size_gib: u64) -> Result<()> {
        self.events
            .borrow_mut()
            .push(Event::Modify(volume_id.to_string(), size_gib));
        Ok(())
    }

    fn describe_modification(&self, volume_id: &str) -> Result<VolumeModification> {
        self.events
            .borrow_mut()
            .push(Event::Describe(volume_id.to_string()));
        let mut states = self.states.borrow_mut();
        let state = if states.len() > 1 {
            states.pop_front().flatten()
        } else {
            states.front().copied().flatten()
        };
        Ok(VolumeModification {
            state,
            status_message: Some("The volume modification failed".to_string()),
        })
    }
}
