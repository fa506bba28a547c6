// Request builders for the Domoticz JSON API
//
// Every call battwatch makes is a GET against `/json.htm` with a query
// string. Requests are built as plain data so they can sit in the
// outbound queue until the engine dispatches them, one at a time.

use std::fmt;

use reqwest::Method;
use urlencoding::encode;

// ── Reorder direction ────────────────────────────────────────────────

/// Direction for the plan reorder endpoint (`way` query parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveWay {
    /// Toward the front of the plan (`way=0`).
    Up,
    /// Toward the back of the plan (`way=1`).
    Down,
}

impl MoveWay {
    fn as_query(self) -> u8 {
        match self {
            Self::Up => 0,
            Self::Down => 1,
        }
    }
}

// ── ApiRequest ───────────────────────────────────────────────────────

/// A single outbound API call: verb plus server-relative URL.
///
/// Immutable once built. Insertion order into the request queue is
/// dispatch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
}

impl ApiRequest {
    fn get(url: String) -> Self {
        Self {
            method: Method::GET,
            url,
        }
    }

    /// List every used device together with its battery level.
    pub fn devices() -> Self {
        Self::get("/json.htm?type=devices&used=true".into())
    }

    /// List all plans.
    pub fn plans() -> Self {
        Self::get("/json.htm?type=plans".into())
    }

    /// Create a plan with the given name.
    pub fn add_plan(name: &str) -> Self {
        Self::get(format!(
            "/json.htm?name={}&param=addplan&type=command",
            encode(name)
        ))
    }

    /// List the devices attached to a plan.
    pub fn plan_devices(plan_id: u32) -> Self {
        Self::get(format!(
            "/json.htm?idx={plan_id}&param=getplandevices&type=command"
        ))
    }

    /// Attach a device to a plan.
    pub fn add_plan_device(device_idx: u32, plan_id: u32) -> Self {
        Self::get(format!(
            "/json.htm?activeidx={device_idx}&activetype=0&idx={plan_id}&param=addplanactivedevice&type=command"
        ))
    }

    /// Move a plan member one position up or down.
    ///
    /// `member_idx` is the membership row id from the plan device
    /// listing, not the device id -- the server's reorder command is
    /// row-addressed.
    pub fn move_plan_device(member_idx: u32, plan_id: u32, way: MoveWay) -> Self {
        Self::get(format!(
            "/json.htm?idx={member_idx}&param=changeplandeviceorder&planid={plan_id}&type=command&way={}",
            way.as_query()
        ))
    }

    /// Register a low-battery notification for a device.
    ///
    /// `ttype=5` is the "value" notification class, `twhen=4` means
    /// "less than or equal", so the server fires once the device value
    /// drops to `empty_level`.
    pub fn add_notification(device_idx: u32, message: &str, empty_level: f64) -> Self {
        Self::get(format!(
            "/json.htm?idx={device_idx}&param=addnotification&tmsg={}&tpriority=0&tsendalways=false&tsystems=&ttype=5&tvalue={empty_level}&twhen=4&type=command",
            encode(message)
        ))
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
