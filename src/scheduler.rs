use anyhow::Result;
use rand::Rng;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tracing::{debug, error, info};

use crate::config::LifecycleConfig;
use crate::db::OrderStore;
use crate::entities::OrderStatus;

/// Background driver that walks orders through the kitchen: pending orders
/// are picked up after a short randomized prep delay, in-progress orders are
/// completed on the next cycle.
pub struct LifecycleDriver {
    store: OrderStore,
    config: LifecycleConfig,
    running: Arc<RwLock<bool>>,
}

impl LifecycleDriver {
    pub fn new(store: OrderStore, config: LifecycleConfig) -> Self {
        Self {
            store,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Order lifecycle driver is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!(
            "Starting order lifecycle driver (prep {}-{}s, cycle {}s)",
            self.config.prep_delay_min_seconds,
            self.config.prep_delay_max_seconds,
            self.config.cycle_interval_seconds
        );

        loop {
            if !*self.running.read().await {
                break;
            }

            // One failed cycle must not kill the driver; the next tick
            // retries against the same store.
            if let Err(e) = self.advance_cycle().await {
                error!("Order lifecycle cycle failed: {e:#}");
            }

            tokio::time::sleep(Duration::from_secs(self.config.cycle_interval_seconds)).await;
        }

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping order lifecycle driver...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Run a single cycle immediately, surfacing any failure to the caller.
    pub async fn run_once(&self) -> Result<()> {
        self.advance_cycle().await
    }

    async fn advance_cycle(&self) -> Result<()> {
        let picked_up = self
            .store
            .sweep_order_status(OrderStatus::Pending, OrderStatus::InProgress)
            .await?;

        if picked_up > 0 {
            info!("Picked up {picked_up} pending order(s)");
        } else {
            debug!("No pending orders to pick up");
        }

        let prep_delay = self.prep_delay();
        tokio::time::sleep(prep_delay).await;

        let completed = self
            .store
            .sweep_order_status(OrderStatus::InProgress, OrderStatus::Completed)
            .await?;

        if completed > 0 {
            info!("Completed {completed} in-progress order(s)");
        }

        Ok(())
    }

    fn prep_delay(&self) -> Duration {
        let min = self.config.prep_delay_min_seconds;
        let max = self.config.prep_delay_max_seconds.max(min);
        let secs = rand::rng().random_range(min..=max);
        Duration::from_secs(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewDish, OrderItemRequest};
    use rust_decimal::Decimal;

    fn instant_config() -> LifecycleConfig {
        LifecycleConfig {
            enabled: true,
            prep_delay_min_seconds: 0,
            prep_delay_max_seconds: 0,
            cycle_interval_seconds: 1,
        }
    }

    async fn store_with_order() -> (OrderStore, i32) {
        let store = OrderStore::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .unwrap();

        let dish = store
            .create_dish(NewDish {
                name: "Soup".to_string(),
                description: None,
                price: Decimal::new(350, 2),
                quantity: 10,
            })
            .await
            .unwrap();

        let details = store
            .create_order(
                1,
                String::new(),
                &[OrderItemRequest {
                    dish_id: dish.id,
                    quantity: 1,
                }],
            )
            .await
            .unwrap();

        (store, details.order.id)
    }

    #[tokio::test]
    async fn test_run_once_advances_pending_to_completed() {
        let (store, order_id) = store_with_order().await;
        let driver = LifecycleDriver::new(store.clone(), instant_config());

        driver.run_once().await.unwrap();

        let order = store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.order.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn test_run_once_ignores_cancelled_orders() {
        let (store, order_id) = store_with_order().await;
        store
            .update_order_status(order_id, OrderStatus::Cancelled)
            .await
            .unwrap();

        let driver = LifecycleDriver::new(store.clone(), instant_config());
        driver.run_once().await.unwrap();

        let order = store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.order.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_driver_is_not_running_until_started() {
        let (store, _) = store_with_order().await;
        let driver = LifecycleDriver::new(store, instant_config());
        assert!(!driver.is_running().await);
    }
}
