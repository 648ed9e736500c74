//! Generated protobuf types and gRPC stubs for the DefraDB replication API.
//!
//! The client half (`service_client::ServiceClient`) is used by
//! `defra-client`; the server half (`service_server`) lets tests stand up an
//! in-process node.

tonic::include_proto!("api.pb");
