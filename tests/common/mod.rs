//! Shared test host: records every lifecycle event it sees.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;

use mosaic::host::{
    ContainerController, ElementHandle, HostResult, LifecycleExports, LifecycleFn, ResourceLoader,
    Sandbox,
};

/// An in-memory host implementing every collaborator trait. Lifecycle
/// activity is appended to a shared event log so tests can assert ordering.
pub struct RecordingHost {
    events: Arc<Mutex<Vec<String>>>,
    load_delays: Mutex<HashMap<String, u64>>,
    mount_delays: Mutex<HashMap<String, u64>>,
}

impl RecordingHost {
    pub fn new() -> Arc<RecordingHost> {
        Arc::new(RecordingHost {
            events: Arc::new(Mutex::new(Vec::new())),
            load_delays: Mutex::new(HashMap::new()),
            mount_delays: Mutex::new(HashMap::new()),
        })
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn saw(&self, event: &str) -> bool {
        self.events.lock().unwrap().iter().any(|e| e == event)
    }

    /// Delay the named application's loader by `ms` milliseconds.
    pub fn set_load_delay(&self, app: &str, ms: u64) {
        self.load_delays.lock().unwrap().insert(app.to_string(), ms);
    }

    /// Delay the named application's mount hook by `ms` milliseconds.
    pub fn set_mount_delay(&self, app: &str, ms: u64) {
        self.mount_delays.lock().unwrap().insert(app.to_string(), ms);
    }
}

fn hook(events: Arc<Mutex<Vec<String>>>, event: String, delay_ms: u64) -> LifecycleFn {
    Box::new(move |_args| {
        let events = events.clone();
        let event = event.clone();
        Box::pin(async move {
            if delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            events.lock().unwrap().push(event);
            Ok(())
        })
    })
}

impl ResourceLoader for RecordingHost {
    fn load(&self, app_name: &str) -> BoxFuture<'static, HostResult<LifecycleExports>> {
        let name = app_name.to_string();
        let events = self.events.clone();
        let load_delay = self
            .load_delays
            .lock()
            .unwrap()
            .get(app_name)
            .copied()
            .unwrap_or(0);
        let mount_delay = self
            .mount_delays
            .lock()
            .unwrap()
            .get(app_name)
            .copied()
            .unwrap_or(0);

        Box::pin(async move {
            if load_delay > 0 {
                tokio::time::sleep(Duration::from_millis(load_delay)).await;
            }
            events.lock().unwrap().push(format!("load:{name}"));
            Ok(LifecycleExports {
                bootstrap: Some(hook(events.clone(), format!("bootstrap:{name}"), 0)),
                mount: Some(hook(events.clone(), format!("mount:{name}"), mount_delay)),
                unmount: Some(hook(events.clone(), format!("unmount:{name}"), 0)),
            })
        })
    }
}

impl ContainerController for RecordingHost {
    fn create_element(&self, app_name: &str) -> BoxFuture<'static, HostResult<ElementHandle>> {
        let name = app_name.to_string();
        Box::pin(async move { Ok(Arc::new(name) as ElementHandle) })
    }

    fn render(&self, _app_name: &str, _element: ElementHandle) -> HostResult<bool> {
        Ok(true)
    }

    fn query_selector(&self, selector: &str) -> Option<ElementHandle> {
        Some(Arc::new(selector.to_string()))
    }

    fn wait(&self, container_name: &str) -> BoxFuture<'static, HostResult<ElementHandle>> {
        let name = container_name.to_string();
        Box::pin(async move { Ok(Arc::new(name) as ElementHandle) })
    }
}

impl Sandbox for RecordingHost {
    fn start(&self, app_name: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("sandbox-start:{app_name}"));
    }

    fn stop(&self, app_name: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("sandbox-stop:{app_name}"));
    }
}
