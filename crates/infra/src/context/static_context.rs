//! Session context taken from configuration.

use async_trait::async_trait;
use parking_lot::RwLock;
use shuttlelink_core::SessionContextProvider;
use shuttlelink_domain::{Result, SessionContext, ShuttleError, TrackingConfig};
use tracing::info;

/// Route and driver ids fixed at start-up, replaceable at runtime when the
/// driver switches route.
#[derive(Debug, Default)]
pub struct StaticSessionContext {
    route_id: RwLock<Option<String>>,
    driver_id: RwLock<Option<String>>,
}

impl StaticSessionContext {
    pub fn new(route_id: Option<String>, driver_id: Option<String>) -> Self {
        Self { route_id: RwLock::new(non_blank(route_id)), driver_id: RwLock::new(non_blank(driver_id)) }
    }

    pub fn from_config(config: &TrackingConfig) -> Self {
        Self::new(config.route_id.clone(), config.driver_id.clone())
    }

    pub fn set_route(&self, route_id: impl Into<String>) {
        let route_id = route_id.into();
        info!(%route_id, "session route changed");
        *self.route_id.write() = non_blank(Some(route_id));
    }

    pub fn set_driver(&self, driver_id: impl Into<String>) {
        *self.driver_id.write() = non_blank(Some(driver_id.into()));
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[async_trait]
impl SessionContextProvider for StaticSessionContext {
    async fn current(&self) -> Result<SessionContext> {
        let route_id = self
            .route_id
            .read()
            .clone()
            .ok_or_else(|| ShuttleError::Config("no route assigned to this session".into()))?;
        let driver_id = self
            .driver_id
            .read()
            .clone()
            .ok_or_else(|| ShuttleError::Config("no driver assigned to this session".into()))?;
        Ok(SessionContext::new(route_id, driver_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_configured_ids() {
        let context = StaticSessionContext::new(Some("route-1".into()), Some("driver-9".into()));

        let current = context.current().await.unwrap();

        assert_eq!(current, SessionContext::new("route-1", "driver-9"));
    }

    #[tokio::test]
    async fn blank_route_is_missing() {
        let context = StaticSessionContext::new(Some("  ".into()), Some("driver-9".into()));
        assert!(matches!(context.current().await, Err(ShuttleError::Config(_))));

        context.set_route("route-2");
        assert_eq!(context.current().await.unwrap().route_id, "route-2");
    }
}
