use serde_json::Value;

use super::{BackendKind, Medium, Op};

/// No persistence at all: the store is a plain reactive cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryMedium;

impl Medium for MemoryMedium {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn persistent(&self) -> bool {
        false
    }

    fn read(&self, _key: &str) -> Op<Option<Value>> {
        Op::ok(None)
    }

    fn write(&self, _key: &str, _value: &Value) -> Op<()> {
        Op::ok(())
    }

    fn delete(&self, _key: &str) -> Op<()> {
        Op::ok(())
    }
}
