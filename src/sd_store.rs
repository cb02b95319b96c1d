use smooth_drive::{
    CurveKey, MotionCurve, StoreError,
    store::{self, CurveStore},
};
use vexide::fs;

/// Curves kept as text files on the SD card, one file per key.
#[derive(Debug, Default, Clone, Copy)]
pub struct SdCardStore;

impl CurveStore for SdCardStore {
    fn exists(&self, key: &CurveKey) -> bool {
        fs::exists(store::file_name(key).as_str())
    }

    fn read(&self, key: &CurveKey) -> Result<MotionCurve, StoreError> {
        let path = store::file_name(key);
        let text = fs::read_to_string(path.as_str())
            .map_err(|_| StoreError::Missing { key: key.name() })?;
        store::decode(&text)
    }

    fn write(&mut self, key: &CurveKey, curve: &MotionCurve) -> Result<(), StoreError> {
        let path = store::file_name(key);
        fs::write(path.as_str(), store::encode(curve))
            .map_err(|_| StoreError::Unavailable { key: key.name() })
    }
}
