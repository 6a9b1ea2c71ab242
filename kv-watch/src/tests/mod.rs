mod watcher_test;

use std::sync::Arc;

use assertables::*;
use kv_core::errors::*;
use kv_core::prelude::*;
use kv_testutils::*;
use rstest::*;
use tracing_test::traced_test;

use super::*;

// Pulls everything that's currently sitting in a client's outbox without waiting
fn drain(reg: &mut Registration) -> Vec<SharedEvent> {
    let mut events = vec![];
    while let Some(evt) = reg.try_recv() {
        events.push(evt);
    }
    events
}
