use thiserror::Error;

use crate::types::ShaderStage;

/// Upper bound on the size of a captured compile or link diagnostic.
pub const DIAGNOSTIC_LOG_LIMIT: usize = 4096;

/// Fatal start-up failures of the renderer.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("failed to compile {stage} shader:\n{log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("failed to link shader program:\n{log}")]
    Link { log: String },
    #[error("failed to initialise graphics context: {0}")]
    ContextInit(String),
}

impl RendererError {
    pub(crate) fn compile(stage: ShaderStage, log: impl Into<String>) -> Self {
        Self::Compile {
            stage,
            log: bounded_log(log.into()),
        }
    }

    pub(crate) fn link(log: impl Into<String>) -> Self {
        Self::Link {
            log: bounded_log(log.into()),
        }
    }

    pub(crate) fn context_init(what: &str, err: impl std::fmt::Display) -> Self {
        Self::ContextInit(format!("{what}: {err}"))
    }

    /// Diagnostic text attached to compile and link failures.
    pub fn log(&self) -> Option<&str> {
        match self {
            RendererError::Compile { log, .. } | RendererError::Link { log } => Some(log),
            RendererError::ContextInit(_) => None,
        }
    }
}

/// Truncates `log` to [`DIAGNOSTIC_LOG_LIMIT`] bytes on a character boundary.
fn bounded_log(mut log: String) -> String {
    if log.len() > DIAGNOSTIC_LOG_LIMIT {
        let mut end = DIAGNOSTIC_LOG_LIMIT;
        while !log.is_char_boundary(end) {
            end -= 1;
        }
        log.truncate(end);
    }
    log
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_logs_are_truncated_on_char_boundary() {
        let log = "é".repeat(DIAGNOSTIC_LOG_LIMIT);
        let err = RendererError::link(log);
        let captured = err.log().expect("link log");
        assert!(captured.len() <= DIAGNOSTIC_LOG_LIMIT);
        assert!(captured.chars().all(|ch| ch == 'é'));
    }

    #[test]
    fn compile_error_names_the_stage() {
        let err = RendererError::compile(ShaderStage::Fragment, "bad token");
        let message = err.to_string();
        assert!(message.contains("frag"));
        assert!(message.contains("bad token"));
    }
}
