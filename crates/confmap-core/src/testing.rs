//! Hand-registered fixtures shared by the unit tests.

use crate::field::{Config, Field, Slot};
use crate::schema::{FieldKind, FieldSchema, StructSchema};

#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Pool {
    pub size: u32,
    pub name: String,
}

impl Config for Pool {
    fn schema() -> StructSchema {
        StructSchema::new("Pool")
            .field(FieldSchema::of::<u32>("size", "size").with_default("8"))
            .field(FieldSchema::of::<String>("name", "name").with_default("primary"))
    }

    fn field_mut(&mut self, index: usize) -> Slot<'_> {
        match index {
            0 => self.size.slot(),
            1 => self.name.slot(),
            _ => Slot::Opaque,
        }
    }
}

impl Field for Pool {
    fn kind() -> FieldKind {
        FieldKind::Struct(<Self as Config>::schema)
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::Struct(self)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Server {
    pub host_port: String,
    pub use_tls: bool,
    pub retries: i64,
    pub ratio: f64,
    pub pool: Pool,
    pub tags: Vec<String>,
    pub replicas: Vec<Pool>,
    pub generation: u64,
}

impl Config for Server {
    fn schema() -> StructSchema {
        StructSchema::new("Server")
            .field(FieldSchema::of::<String>("host_port", "hostPort").with_default("127.0.0.1:6379"))
            .field(FieldSchema::of::<bool>("use_tls", "useTls").with_default("true"))
            .field(FieldSchema::of::<i64>("retries", "retries").with_default("3"))
            .field(FieldSchema::of::<f64>("ratio", "ratio").with_default("0.5"))
            .field(FieldSchema::of::<Pool>("pool", "pool"))
            .field(FieldSchema::of::<Vec<String>>("tags", "tags"))
            .field(FieldSchema::of::<Vec<Pool>>("replicas", "replicas"))
            .field(FieldSchema::skipped::<u64>("generation"))
    }

    fn field_mut(&mut self, index: usize) -> Slot<'_> {
        match index {
            0 => self.host_port.slot(),
            1 => self.use_tls.slot(),
            2 => self.retries.slot(),
            3 => self.ratio.slot(),
            4 => self.pool.slot(),
            5 => self.tags.slot(),
            6 => self.replicas.slot(),
            _ => Slot::Opaque,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Node {
    pub label: String,
    pub children: Vec<Node>,
}

impl Config for Node {
    fn schema() -> StructSchema {
        StructSchema::new("Node")
            .field(FieldSchema::of::<String>("label", "label").with_default("root"))
            .field(FieldSchema::of::<Vec<Node>>("children", "children"))
    }

    fn field_mut(&mut self, index: usize) -> Slot<'_> {
        match index {
            0 => self.label.slot(),
            1 => self.children.slot(),
            _ => Slot::Opaque,
        }
    }
}

impl Field for Node {
    fn kind() -> FieldKind {
        FieldKind::Struct(<Self as Config>::schema)
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::Struct(self)
    }
}
