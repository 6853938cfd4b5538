use metrics_exporter_prometheus::PrometheusHandle;
use recruitment_tracker::config::AppConfig;
use recruitment_tracker::error::AppError;
use recruitment_tracker::pipeline::{
    AccessLevel, DispatchError, EmailDispatcher, OutboundEmail, RecruitmentService, SqliteStore,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) type TrackerService = RecruitmentService<SqliteStore, LogDispatcher>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Email transport that records outbound messages in the service log. Stands in
/// until an SMTP relay is configured.
#[derive(Debug, Clone, Default)]
pub(crate) struct LogDispatcher {
    from: Option<String>,
}

impl LogDispatcher {
    pub(crate) fn new(from: Option<String>) -> Self {
        Self { from }
    }
}

impl EmailDispatcher for LogDispatcher {
    fn dispatch(&self, email: &OutboundEmail) -> Result<(), DispatchError> {
        info!(
            from = self.from.as_deref().unwrap_or("unset"),
            to = %email.recipient,
            subject = %email.subject,
            bytes = email.body.len(),
            "outbound email"
        );
        Ok(())
    }
}

/// Opens the configured database and wires the service around it.
pub(crate) fn open_service(config: &AppConfig) -> Result<Arc<TrackerService>, AppError> {
    let store = SqliteStore::open(&config.storage.database_path)?;
    let dispatcher = LogDispatcher::new(config.pipeline.email_from.clone());
    Ok(Arc::new(RecruitmentService::new(
        Arc::new(store),
        Arc::new(dispatcher),
        config.pipeline.lock_policy(),
    )))
}

pub(crate) fn parse_access_level(raw: &str) -> Result<AccessLevel, String> {
    let trimmed = raw.trim();
    if let Ok(level) = trimmed.parse::<i64>() {
        return AccessLevel::try_from(level);
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "member" => Ok(AccessLevel::Member),
        "evaluator" => Ok(AccessLevel::Evaluator),
        "admin" => Ok(AccessLevel::Admin),
        _ => Err(format!(
            "'{raw}' is not an access level (use 1-3 or member, evaluator, admin)"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_levels_parse_from_numbers_and_names() {
        assert_eq!(parse_access_level("3"), Ok(AccessLevel::Admin));
        assert_eq!(parse_access_level(" Evaluator "), Ok(AccessLevel::Evaluator));
        assert!(parse_access_level("4").is_err());
        assert!(parse_access_level("owner").is_err());
    }
}
