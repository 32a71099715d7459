use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Source du temps "maintenant" du collecteur. Injectée pour que les tests
/// puissent piloter la péremption sans attendre.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Horloge murale du collecteur, au décalage fixé au démarrage
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    pub fn with_offset(offset: UtcOffset) -> Self {
        Self { offset }
    }
}

/// Décalage local, UTC s'il est indéterminable.
/// Sous Unix, à appeler avant de lancer le moindre thread (runtime tokio compris).
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}

/// Format fil et journal : `YYYY-MM-DD HH:MM:SS`
pub fn format_timestamp(t: OffsetDateTime) -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    t.format(fmt).unwrap_or_else(|_| crate::models::UNSET_TIMESTAMP.to_string())
}

#[cfg(test)]
pub struct ManualClock(parking_lot::Mutex<OffsetDateTime>);

#[cfg(test)]
impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self(parking_lot::Mutex::new(start))
    }

    pub fn advance(&self, by: time::Duration) {
        *self.0.lock() += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.0.lock()
    }
}
