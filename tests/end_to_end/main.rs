//! End-to-end runs through the public facade
//!
//! A scripted agent plays the kernel side of full sessions: configuration
//! loading, discovery, enumeration of exposed names and running every test.

mod agent;
mod hybrid;
mod lifecycle;
