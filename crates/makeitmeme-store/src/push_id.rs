//! Chronologically sortable keys for pushed children.

/// Generates keys of the form `<millis:12 hex><counter:6 hex>`.
///
/// Keys are strictly increasing in lexical order even if the clock stalls
/// or steps backwards, so sorting children by key gives insertion order.
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    last_millis: i64,
    counter: u32,
}

const MAX_COUNTER: u32 = 0x00FF_FFFF;

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self, now_millis: i64) -> String {
        if now_millis > self.last_millis {
            self.last_millis = now_millis;
            self.counter = 0;
        } else if self.counter == MAX_COUNTER {
            self.last_millis += 1;
            self.counter = 0;
        } else {
            self.counter += 1;
        }
        format!("{:012x}{:06x}", self.last_millis.max(0), self.counter)
    }
}
