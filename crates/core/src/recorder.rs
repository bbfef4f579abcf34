use yarn_scene::{Curves, Request};

use crate::error::SinkError;
use crate::session::{check_scope_balance, SceneSink};

/// Keeps every request in memory. Used for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    requests: Vec<Request>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    pub fn count(&self, name: &str) -> usize {
        self.requests
            .iter()
            .filter(|request| request.name() == name)
            .count()
    }

    pub fn curves(&self) -> impl Iterator<Item = &Curves> {
        self.requests.iter().filter_map(|request| match request {
            Request::Curves(curves) => Some(curves),
            _ => None,
        })
    }

    /// Deepest nesting of the recorded stream, or the first scope error.
    pub fn scope_balance(&self) -> Result<usize, SinkError> {
        check_scope_balance(&self.requests)
    }
}

impl SceneSink for RecordingSink {
    fn submit(&mut self, request: Request) -> Result<(), SinkError> {
        self.requests.push(request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_unbalanced_recording() {
        let mut sink = RecordingSink::new();
        sink.submit(Request::WorldBegin).unwrap();
        sink.submit(Request::AttributeBegin).unwrap();
        assert!(matches!(
            sink.scope_balance(),
            Err(SinkError::UnclosedScopes { open: 2 })
        ));
        sink.submit(Request::AttributeEnd).unwrap();
        sink.submit(Request::WorldEnd).unwrap();
        assert_eq!(sink.scope_balance().unwrap(), 2);
        assert_eq!(sink.count("AttributeEnd"), 1);
    }
}
