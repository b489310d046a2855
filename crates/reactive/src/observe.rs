//! `observe_changes`: subscribe to a live query at the primitive level.

use crate::callbacks::ObserveCallbacks;
use crate::config::ObserveOptions;
use crate::driver::ObserveDriver;
use crate::handle::ObserveHandle;
use crate::multiplexer::Multiplexer;
use crate::registry::MultiplexerRegistry;
use liveset_core::{Error, Result};
use std::sync::Arc;

/// Subscribes `callbacks` to the live query identified by `options`.
///
/// If the registry already has a live multiplexer for the subscription key
/// the handle joins it and receives the current result set as adds.
/// Otherwise `make_driver` is called with the options and the resolved
/// ordering, a new multiplexer is registered, and the driver is initialized
/// after the handle is registered, so no initial document is missed.
///
/// Resolves once the initial result set has been delivered and the
/// multiplexer is ready. If the driver fails to initialize, the multiplexer
/// stops, every subscriber waiting on it fails with `Stopped`, and the key is
/// freed for the next subscription. Stopping the last handle removes the multiplexer
/// from the registry and stops the driver.
pub async fn observe_changes<F>(
    registry: &MultiplexerRegistry,
    callbacks: ObserveCallbacks,
    options: ObserveOptions,
    make_driver: F,
) -> Result<ObserveHandle>
where
    F: FnOnce(&ObserveOptions, bool) -> Arc<dyn ObserveDriver>,
{
    callbacks.validate()?;
    let ordered = options.ordered.unwrap_or_else(|| callbacks.is_ordered());
    let key = match &options.multiplexer_id {
        Some(key_fn) => key_fn(&options, ordered),
        None => registry.fresh_key(),
    };

    let mut make_driver = Some(make_driver);
    loop {
        let (multiplexer, driver) = match registry.get(&key).filter(|m| !m.is_stopped()) {
            Some(existing) => (existing, None),
            None => {
                let candidate = Multiplexer::new(options.multiplexer_options(ordered));
                match registry.insert_if_absent(&key, candidate) {
                    (existing, false) => (existing, None),
                    (multiplexer, true) => {
                        let make_driver = make_driver.take().ok_or_else(|| {
                            Error::invalid_operation("driver factory already used")
                        })?;
                        let driver = make_driver(&options, ordered);
                        install_stop_hook(registry, &key, &multiplexer, driver.clone());
                        tracing::debug!(
                            key = %key,
                            multiplexer = multiplexer.id(),
                            ordered,
                            "multiplexer created"
                        );
                        (multiplexer, Some(driver))
                    }
                }
            }
        };

        let joined = multiplexer.add_handle(callbacks.clone(), options.handle_options());
        let initial_adds = match joined {
            Ok(initial_adds) => initial_adds,
            // The shared multiplexer stopped between lookup and join.
            Err(Error::Stopped) if driver.is_none() => {
                registry.remove_if(&key, multiplexer.id());
                continue;
            }
            Err(err) => return Err(err),
        };

        if let Some(driver) = driver {
            if let Err(err) = driver.init(multiplexer.clone()).await {
                tracing::warn!(key = %key, error = %err, "driver init failed");
                // Subscribers that joined during init must not wait forever.
                multiplexer.fail();
                return Err(err);
            }
        }

        return initial_adds.await;
    }
}

fn install_stop_hook(
    registry: &MultiplexerRegistry,
    key: &str,
    multiplexer: &Multiplexer,
    driver: Arc<dyn ObserveDriver>,
) {
    let registry = registry.clone();
    let key = key.to_string();
    let id = multiplexer.id();
    multiplexer.on_stop(move || {
        registry.remove_if(&key, id);
        driver.stop();
    });
}
