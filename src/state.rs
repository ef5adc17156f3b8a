use crate::config::BridgeConfig;
use crate::features::qr::{QrDecoder, RxingDecoder};
use crate::platform::Platform;
use crate::slot::ResultSlot;
use std::sync::Arc;

/// Everything one attached plugin instance owns: its collaborators, its
/// configuration and the single pending-request slot.
pub struct Bridge {
    platform: Arc<dyn Platform>,
    decoder: Box<dyn QrDecoder>,
    config: BridgeConfig,
    slot: ResultSlot,
}

impl Bridge {
    pub fn new(platform: Arc<dyn Platform>, config: BridgeConfig) -> Self {
        Self {
            platform,
            decoder: Box::new(RxingDecoder),
            slot: ResultSlot::new(config.slot_timeout()),
            config,
        }
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    pub fn decoder(&self) -> &dyn QrDecoder {
        self.decoder.as_ref()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn slot(&self) -> &ResultSlot {
        &self.slot
    }

    pub fn sdk_int(&self) -> u32 {
        self.platform.info().sdk_int
    }
}
