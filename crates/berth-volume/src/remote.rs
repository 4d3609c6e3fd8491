//! Volume drivers living in a plugin process.
//!
//! Each volume operation maps to one `VolumeDriver.*` RPC. The plugin
//! answers `{"Mountpoint": ..., "Err": ...}`; a non-empty `Err` is a
//! driver-reported failure.

use std::path::PathBuf;
use std::sync::Arc;

use berth_common::error::{BerthError, Result};
use berth_plugins::Client;
use serde::{Deserialize, Serialize};

use crate::volume::{Driver, Volume};

const CREATE: &str = "VolumeDriver.Create";
const REMOVE: &str = "VolumeDriver.Remove";
const PATH: &str = "VolumeDriver.Path";
const MOUNT: &str = "VolumeDriver.Mount";
const UNMOUNT: &str = "VolumeDriver.Unmount";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct VolumeRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct VolumeResponse {
    mountpoint: String,
    err: String,
}

/// Calls `method` for volume `name` and checks the embedded error field.
fn volume_call(client: &Client, method: &str, name: &str) -> Result<VolumeResponse> {
    let resp: VolumeResponse = client.call(method, &VolumeRequest { name })?;
    if resp.err.is_empty() {
        Ok(resp)
    } else {
        Err(BerthError::RemoteError { message: resp.err })
    }
}

/// A driver reached over the plugin protocol.
#[derive(Debug)]
pub struct RemoteDriver {
    name: String,
    client: Arc<Client>,
}

impl RemoteDriver {
    /// Wraps `client` as the driver called `name`.
    pub fn new(name: impl Into<String>, client: Client) -> Self {
        Self {
            name: name.into(),
            client: Arc::new(client),
        }
    }
}

impl Driver for RemoteDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self, name: &str) -> Result<Arc<dyn Volume>> {
        let _ = volume_call(&self.client, CREATE, name)?;
        tracing::debug!(driver = %self.name, volume = name, "remote volume created");
        Ok(Arc::new(RemoteVolume {
            name: name.to_owned(),
            driver_name: self.name.clone(),
            client: Arc::clone(&self.client),
        }))
    }

    fn remove(&self, volume: &dyn Volume) -> Result<()> {
        let _ = volume_call(&self.client, REMOVE, volume.name())?;
        Ok(())
    }
}

/// Handle to a volume managed by a [`RemoteDriver`].
#[derive(Debug, Clone)]
pub struct RemoteVolume {
    name: String,
    driver_name: String,
    client: Arc<Client>,
}

impl Volume for RemoteVolume {
    fn name(&self) -> &str {
        &self.name
    }

    fn driver_name(&self) -> &str {
        &self.driver_name
    }

    fn path(&self) -> Result<PathBuf> {
        volume_call(&self.client, PATH, &self.name).map(|r| PathBuf::from(r.mountpoint))
    }

    fn mount(&self) -> Result<PathBuf> {
        volume_call(&self.client, MOUNT, &self.name).map(|r| PathBuf::from(r.mountpoint))
    }

    fn unmount(&self) -> Result<()> {
        volume_call(&self.client, UNMOUNT, &self.name).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use berth_common::config::RetryPolicy;
    use berth_plugins::{RawResponse, Transport, TransportError};

    use super::*;

    /// Answers every call from a fixed method → body table and logs requests.
    #[derive(Debug, Default, Clone)]
    struct FakePlugin {
        answers: Arc<Mutex<Vec<(String, u16, String)>>>,
        requests: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl FakePlugin {
        fn answer(self, method: &str, status: u16, body: &str) -> Self {
            self.answers
                .lock()
                .unwrap()
                .push((format!("/{method}"), status, body.to_owned()));
            self
        }
    }

    impl Transport for FakePlugin {
        fn post(
            &self,
            path: &str,
            body: Vec<u8>,
            _timeout: Duration,
        ) -> std::result::Result<RawResponse, TransportError> {
            self.requests
                .lock()
                .unwrap()
                .push((path.to_owned(), String::from_utf8(body).unwrap()));
            let answers = self.answers.lock().unwrap();
            let (_, status, body) = answers
                .iter()
                .find(|(p, _, _)| p == path)
                .ok_or_else(|| TransportError::Connect("unexpected method".into()))?;
            Ok(RawResponse {
                status: *status,
                body: body.clone().into_bytes(),
            })
        }
    }

    fn driver(plugin: FakePlugin) -> RemoteDriver {
        let client = Client::with_transport(
            "127.0.0.1:9",
            plugin,
            RetryPolicy {
                base_ms: 1,
                cap_ms: 1,
                timeout_ms: 1,
            },
        );
        RemoteDriver::new("flocker", client)
    }

    #[test]
    fn create_sends_name_and_returns_handle() {
        let plugin = FakePlugin::default().answer(CREATE, 200, r#"{"Err": ""}"#);
        let drv = driver(plugin.clone());

        let vol = drv.create("pgdata").expect("create");
        assert_eq!(vol.name(), "pgdata");
        assert_eq!(vol.driver_name(), "flocker");

        let requests = plugin.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "/VolumeDriver.Create");
        let body: serde_json::Value = serde_json::from_str(&requests[0].1).unwrap();
        assert_eq!(body, serde_json::json!({"Name": "pgdata"}));
    }

    #[test]
    fn embedded_err_field_is_a_remote_error() {
        let plugin = FakePlugin::default().answer(CREATE, 200, r#"{"Err": "quota exceeded"}"#);
        let err = driver(plugin).create("big").unwrap_err();
        assert!(matches!(err, BerthError::RemoteError { ref message } if message == "quota exceeded"));
    }

    #[test]
    fn mount_and_path_return_mountpoint() {
        let plugin = FakePlugin::default()
            .answer(CREATE, 200, "{}")
            .answer(MOUNT, 200, r#"{"Mountpoint": "/mnt/flocker/pgdata"}"#)
            .answer(PATH, 200, r#"{"Mountpoint": "/mnt/flocker/pgdata", "Err": ""}"#)
            .answer(UNMOUNT, 200, "{}");
        let vol = driver(plugin).create("pgdata").expect("create");

        assert_eq!(vol.mount().unwrap(), PathBuf::from("/mnt/flocker/pgdata"));
        assert_eq!(vol.path().unwrap(), PathBuf::from("/mnt/flocker/pgdata"));
        vol.unmount().expect("unmount");
    }

    #[test]
    fn remove_surfaces_error_status_verbatim() {
        let plugin = FakePlugin::default()
            .answer(CREATE, 200, "{}")
            .answer(REMOVE, 409, "volume pgdata is in use");
        let drv = driver(plugin);
        let vol = drv.create("pgdata").expect("create");

        let err = drv.remove(vol.as_ref()).unwrap_err();
        assert_eq!(err.to_string(), "plugin error: volume pgdata is in use");
    }
}
