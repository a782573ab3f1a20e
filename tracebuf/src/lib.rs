//! # tracebuf - Background bpftrace Execution with Buffered Output
//!
//! tracebuf is a tool server that runs bpftrace programs as background
//! processes, captures their output line by line into a bounded in-memory
//! buffer, and lets a caller page through that buffer while the program is
//! still running. Old results are garbage collected.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Client (agent / editor)                      │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ MCP (JSON-RPC 2.0), one message per line
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    tracebuf (This Crate)                        │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐        │
//! │  │    server    │──▶│   service    │──▶│    tools     │        │
//! │  │ (rmcp,stdio) │   │ (4 tools)    │   │ (probes, -l) │        │
//! │  └──────────────┘   └──────┬───────┘   └──────────────┘        │
//! │                            │                                    │
//! │            ┌───────────────┼────────────────┐                  │
//! │            ▼               ▼                ▼                  │
//! │   ┌──────────────┐ ┌──────────────┐ ┌──────────────┐           │
//! │   │ Coordinator  │ │    Pager     │ │  Collector   │           │
//! │   │ (start+grace)│ │(offset/limit)│ │ (retention)  │           │
//! │   └──────┬───────┘ └──────┬───────┘ └──────┬───────┘           │
//! │          │                ▼                │                    │
//! │          │        ┌──────────────┐         │                    │
//! │          │        │   Registry   │◀────────┘                    │
//! │          │        │ id → record  │                              │
//! │          ▼        └──────────────┘                              │
//! │   ┌──────────────┐        ▲ appends via RecordWriter            │
//! │   │    Runner    │────────┘                                     │
//! │   └──────┬───────┘                                              │
//! └──────────┼──────────────────────────────────────────────────────┘
//!            │ sudo -S bpftrace -e '<program>'
//!            ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   bpftrace (child process)                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`execution`]: the buffered execution engine
//!   - `record`: per-run buffer and state, appended by a single writer
//!   - `registry`: shared id → record map
//!   - `runner`: spawn, stream stdout under a deadline, terminate
//!   - `collector`: periodic retention sweep
//!   - `pager`: offset/limit reads of a live buffer
//!   - `coordinator`: start with a grace window for immediate failures
//!
//! - [`launch`]: how the tracing binary is invoked and authenticated
//!
//! - [`tools`]: probe listing and the helper catalog
//!
//! - [`service`]: the four tool operations over one registry
//!
//! - [`server`]: MCP tool handler (`rmcp`) over stdio
//!
//! - [`cli`], [`config`], [`preflight`]: startup
//!
//! - [`domain`]: execution ids and error types
//!
//! ## Execution Lifecycle
//!
//! ```text
//! running ──▶ completed        stdout EOF, no error on stderr
//!    │
//!    └──────▶ failed           timeout, stderr error, launch/read fault,
//!                              evicted while running
//! ```
//!
//! Transitions happen once. Output keeps its append order, and after
//! `max_lines` lines a single truncation marker is appended and the rest is
//! discarded.
//!
//! ## Typical Usage
//!
//! ```bash
//! # Serve on stdio, elevating each run with sudo
//! TRACEBUF_CREDENTIAL=... tracebuf
//!
//! # Already root
//! sudo tracebuf --no-elevate
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod execution;
pub mod launch;
pub mod preflight;
pub mod server;
pub mod service;
pub mod tools;
