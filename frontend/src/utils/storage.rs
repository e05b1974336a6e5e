//! JSON values kept in the browser's `localStorage`. On the host there is no storage and every
//! call is a no-op.

use serde::{de::DeserializeOwned, Serialize};

#[cfg(target_arch = "wasm32")]
mod browser {
    use web_sys::{Storage, Window};

    pub fn window() -> Result<Window, String> {
        web_sys::window().ok_or_else(|| "No window object".to_string())
    }

    pub fn local_storage() -> Result<Storage, String> {
        window()?
            .local_storage()
            .map_err(|_| "No localStorage".to_string())?
            .ok_or_else(|| "No localStorage".to_string())
    }
}

#[cfg(target_arch = "wasm32")]
pub fn load_json<T: DeserializeOwned>(key: &str) -> Option<T> {
    let storage = match browser::local_storage() {
        Ok(storage) => storage,
        Err(err) => {
            log::debug!("{}", err);
            return None;
        }
    };
    let raw = storage.get_item(key).ok().flatten()?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("Discarding unreadable {} entry: {}", key, err);
            let _ = storage.remove_item(key);
            None
        }
    }
}

/// Writes `value`, or removes the entry when it is `None`.
#[cfg(target_arch = "wasm32")]
pub fn store_json<T: Serialize>(key: &str, value: Option<&T>) {
    let storage = match browser::local_storage() {
        Ok(storage) => storage,
        Err(err) => {
            log::debug!("{}", err);
            return;
        }
    };
    let result = match value.map(serde_json::to_string) {
        Some(Ok(raw)) => storage.set_item(key, &raw),
        Some(Err(err)) => {
            log::warn!("Failed to serialize {}: {}", key, err);
            return;
        }
        None => storage.remove_item(key),
    };
    if result.is_err() {
        log::warn!("localStorage rejected a write to {}", key);
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn load_json<T: DeserializeOwned>(_key: &str) -> Option<T> {
    None
}

#[cfg(not(target_arch = "wasm32"))]
pub fn store_json<T: Serialize>(_key: &str, _value: Option<&T>) {}
