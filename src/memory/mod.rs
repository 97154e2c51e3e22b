// src/memory/mod.rs

use crate::redact::scrub;

/// A trait for the run log: planned steps, tool outcomes, verdict notes.
pub trait Memory {
    fn log(&mut self, label: &str, content: &str);
    fn read_all(&self) -> Vec<(String, String)>;
}

/// In-memory implementation of the Memory trait. Entries are scrubbed of
/// credentials before they are stored.
#[derive(Default, Debug)]
pub struct InMemoryLog {
    pub entries: Vec<(String, String)>,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Entries as `[label] content` lines, oldest first.
    pub fn dump(&self) -> String {
        self.entries
            .iter()
            .map(|(label, content)| format!("[{}] {}", label, content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Memory for InMemoryLog {
    fn log(&mut self, label: &str, content: &str) {
        let content = scrub(content);
        tracing::debug!(label, content = %content, "run log");
        self.entries.push((label.to_string(), content));
    }

    fn read_all(&self) -> Vec<(String, String)> {
        self.entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_scrubbed_and_dumped_in_order() {
        let mut log = InMemoryLog::new();
        log.log("plan", "3 steps");
        log.log("db_mongo_rs_status", "uri=mongodb://admin:pw@m1:27017");
        assert_eq!(
            log.dump(),
            "[plan] 3 steps\n[db_mongo_rs_status] uri=mongodb://admin:***@m1:27017"
        );
        assert_eq!(log.read_all().len(), 2);
    }
}
