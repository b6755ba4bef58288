// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Live resources.
//!
//! One struct per resource family. Every family implements [`ResourceSpec`]
//! through `enum_dispatch`, so the dispatcher and the reconnect walker can
//! ask for a type key or liveness without matching on the concrete family.
//!
//! Serialization never snapshots the unserializable part (an open fd, a
//! running thread, a database session). Handlers extract reconstruction
//! metadata; deserialization produces inert `Reconnector`s; `reconnect_all`
//! rebuilds the live half with caller-supplied secrets.

use std::{
    collections::VecDeque,
    io::Cursor,
    net::{SocketAddr, TcpListener, TcpStream, UdpSocket},
    path::PathBuf,
    process::Child,
    thread::JoinHandle,
};

use anyhow::{Context, Result, bail};
use bitflags::bitflags;
use enum_dispatch::enum_dispatch;

use crate::{
    registry,
    value::{Value, object::Obj, plain::PlainValue},
};

/// Family-level metadata every resource exposes.
#[enum_dispatch]
pub trait ResourceSpec {
    /// Stable type key, doubling as the reconnection auth-map key.
    fn type_key(&self) -> &'static str;

    /// Whether the external half of the resource currently exists.
    fn is_live(&self) -> bool;
}

#[enum_dispatch(ResourceSpec)]
pub enum Resource {
    Lock(LockRes),
    Semaphore(SemaphoreRes),
    Barrier(BarrierRes),
    Event(EventRes),
    Queue(QueueRes),
    Thread(ThreadRes),
    File(FileRes),
    MemBuf(MemBufRes),
    TempFile(TempFileRes),
    Mapped(MappedRes),
    Socket(SocketRes),
    HttpSession(HttpSessionRes),
    Sqlite(SqliteRes),
    DbConn(DbConnRes),
    Generator(GeneratorRes),
    Task(TaskRes),
    Pool(PoolRes),
    Child(ChildRes),
    ContextVar(ContextVarRes),
    Logger(LoggerRes),
    RegexPattern(RegexRes),
    RegexMatch(RegexMatchRes),
}

// ---------------------------------------------------------------------------
// concurrency primitives
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Mutex,
    RwLock,
}

/// Cooperative lock for the dynamic object space. Reconstructs unlocked.
pub struct LockRes {
    pub kind: LockKind,
    pub locked: bool,
}

impl LockRes {
    pub fn mutex() -> Self {
        Self { kind: LockKind::Mutex, locked: false }
    }

    pub fn rwlock() -> Self {
        Self { kind: LockKind::RwLock, locked: false }
    }

    pub fn try_acquire(&mut self) -> bool {
        if self.locked {
            return false;
        }
        self.locked = true;
        true
    }

    pub fn release(&mut self) {
        self.locked = false;
    }
}

impl ResourceSpec for LockRes {
    fn type_key(&self) -> &'static str {
        match self.kind {
            LockKind::Mutex => "std.sync.Mutex",
            LockKind::RwLock => "std.sync.RwLock",
        }
    }

    fn is_live(&self) -> bool {
        true
    }
}

/// Counting semaphore backed by tokio; `max` is remembered so an equivalent
/// primitive can be rebuilt.
pub struct SemaphoreRes {
    pub max: usize,
    inner: tokio::sync::Semaphore,
}

impl SemaphoreRes {
    pub fn new(max: usize) -> Self {
        Self { max, inner: tokio::sync::Semaphore::new(max) }
    }

    pub fn with_available(max: usize, available: usize) -> Self {
        Self { max, inner: tokio::sync::Semaphore::new(available.min(max)) }
    }

    #[inline]
    pub fn available(&self) -> usize {
        self.inner.available_permits()
    }

    pub fn try_acquire(&self) -> bool {
        match self.inner.try_acquire() {
            Ok(permit) => {
                permit.forget();
                true
            },
            Err(_) => false,
        }
    }

    pub fn release(&self) {
        self.inner.add_permits(1);
    }
}

impl ResourceSpec for SemaphoreRes {
    fn type_key(&self) -> &'static str {
        "tokio.sync.Semaphore"
    }

    fn is_live(&self) -> bool {
        true
    }
}

pub struct BarrierRes {
    pub parties: usize,
    pub inner: std::sync::Barrier,
}

impl BarrierRes {
    pub fn new(parties: usize) -> Self {
        Self { parties, inner: std::sync::Barrier::new(parties) }
    }
}

impl ResourceSpec for BarrierRes {
    fn type_key(&self) -> &'static str {
        "std.sync.Barrier"
    }

    fn is_live(&self) -> bool {
        true
    }
}

/// Manually-reset event flag. Reconstructs matching its signaled state.
pub struct EventRes {
    set: bool,
}

impl EventRes {
    pub fn new(set: bool) -> Self {
        Self { set }
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.set
    }

    pub fn set(&mut self) {
        self.set = true;
    }

    pub fn clear(&mut self) {
        self.set = false;
    }
}

impl ResourceSpec for EventRes {
    fn type_key(&self) -> &'static str {
        "sync.Event"
    }

    fn is_live(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Fifo,
    Lifo,
    Priority,
}

/// In-space queue. Items are captured as a best-effort instantaneous
/// snapshot; a queue mutated mid-serialization may diverge.
pub struct QueueRes {
    pub kind: QueueKind,
    pub maxsize: Option<usize>,
    items: VecDeque<Value>,
}

impl QueueRes {
    pub fn new(kind: QueueKind, maxsize: Option<usize>) -> Self {
        Self { kind, maxsize, items: VecDeque::new() }
    }

    pub fn push(&mut self, value: Value) -> Result<()> {
        if let Some(cap) = self.maxsize
            && self.items.len() >= cap
        {
            bail!("queue full (maxsize {cap})");
        }
        self.items.push_back(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Value> {
        match self.kind {
            QueueKind::Fifo => self.items.pop_front(),
            QueueKind::Lifo => self.items.pop_back(),
            QueueKind::Priority => {
                let idx = self
                    .items
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, v)| v.as_int().unwrap_or(i64::MAX))
                    .map(|(i, _)| i)?;
                self.items.remove(idx)
            },
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn snapshot(&self) -> Vec<Value> {
        self.items.iter().cloned().collect()
    }

    pub fn restore(&mut self, items: Vec<Value>) {
        self.items = items.into();
    }
}

impl ResourceSpec for QueueRes {
    fn type_key(&self) -> &'static str {
        match self.kind {
            QueueKind::Fifo => "sync.Queue",
            QueueKind::Lifo => "sync.LifoQueue",
            QueueKind::Priority => "sync.PriorityQueue",
        }
    }

    fn is_live(&self) -> bool {
        true
    }
}

/// A thread: target function plus arguments, unstarted until `start`.
pub struct ThreadRes {
    pub name: Option<String>,
    pub target: Value,
    pub args: Vec<Value>,
    pub started: bool,
    pub handle: Option<JoinHandle<()>>,
}

impl ThreadRes {
    pub fn new(target: Value, args: Vec<Value>) -> Self {
        Self { name: None, target, args, started: false, handle: None }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Function-registry key of the target.
    pub fn target_key(&self) -> Result<String> {
        let Some(r) = self.target.as_obj() else {
            bail!("thread target is not a function value");
        };
        match &*r.borrow() {
            Obj::Function(f) => Ok(f.key()),
            other => bail!("thread target is a {}", other.kind()),
        }
    }

    /// Spawn the target on a fresh OS thread. Arguments are lowered to the
    /// `Send`-able plain subset and lifted back inside the thread.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            bail!("thread already started");
        }
        let key = self.target_key()?;
        let Some(f) = registry::lookup_fn(&key) else {
            bail!("thread target `{key}` is not registered");
        };
        let plain: Vec<PlainValue> = self
            .args
            .iter()
            .map(PlainValue::lower)
            .collect::<Result<_>>()
            .context("thread arguments must be plain data")?;

        let mut builder = std::thread::Builder::new();
        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }
        let handle = builder
            .spawn(move || {
                let args: Vec<Value> =
                    plain.into_iter().map(PlainValue::lift).collect();
                if let Err(e) = f(&args) {
                    tracing::warn!("thread target failed: {e:#}");
                }
            })
            .context("failed to spawn thread")?;

        self.started = true;
        self.handle = Some(handle);
        Ok(())
    }

    pub fn join(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(h) => h.join().map_err(|_| anyhow::anyhow!("thread panicked")),
            None => Ok(()),
        }
    }
}

impl ResourceSpec for ThreadRes {
    fn type_key(&self) -> &'static str {
        "std.thread.Thread"
    }

    fn is_live(&self) -> bool {
        self.handle.is_some()
    }
}

// ---------------------------------------------------------------------------
// file-like
// ---------------------------------------------------------------------------

bitflags! {
    /// Open-mode bits remembered across a round-trip.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileMode: u8 {
        const READ     = 0b0000_0001;
        const WRITE    = 0b0000_0010;
        const APPEND   = 0b0000_0100;
        const CREATE   = 0b0000_1000;
        const TRUNCATE = 0b0001_0000;
        const BINARY   = 0b0010_0000;
    }
}

pub struct FileRes {
    pub path: PathBuf,
    pub mode: FileMode,
    pub pos: u64,
    pub encoding: Option<String>,
    pub handle: Option<std::fs::File>,
}

impl FileRes {
    pub fn new(path: impl Into<PathBuf>, mode: FileMode) -> Self {
        Self {
            path: path.into(),
            mode,
            pos: 0,
            encoding: None,
            handle: None,
        }
    }

    /// Open (or reopen) the backing file per the remembered mode and seek to
    /// the remembered position.
    pub fn reopen(&mut self) -> Result<()> {
        use std::io::{Seek, SeekFrom};

        let mut opts = std::fs::OpenOptions::new();
        opts.read(self.mode.contains(FileMode::READ))
            .write(self.mode.contains(FileMode::WRITE))
            .append(self.mode.contains(FileMode::APPEND))
            .create(self.mode.contains(FileMode::CREATE))
            .truncate(self.mode.contains(FileMode::TRUNCATE));
        let mut file = opts
            .open(&self.path)
            .with_context(|| format!("failed to reopen {:?}", self.path))?;
        if self.pos > 0 {
            file.seek(SeekFrom::Start(self.pos))
                .with_context(|| format!("failed to seek {:?}", self.path))?;
        }
        self.handle = Some(file);
        Ok(())
    }

    /// Current cursor position, preferring the live handle.
    pub fn position(&mut self) -> u64 {
        use std::io::Seek;
        if let Some(file) = &mut self.handle
            && let Ok(pos) = file.stream_position()
        {
            self.pos = pos;
        }
        self.pos
    }
}

impl ResourceSpec for FileRes {
    fn type_key(&self) -> &'static str {
        "std.fs.File"
    }

    fn is_live(&self) -> bool {
        self.handle.is_some()
    }
}

/// In-memory file. Fully serializable, rebuilt live without reconnection.
pub struct MemBufRes {
    pub inner: Cursor<Vec<u8>>,
}

impl MemBufRes {
    pub fn new(data: Vec<u8>) -> Self {
        Self { inner: Cursor::new(data) }
    }

    pub fn with_pos(data: Vec<u8>, pos: u64) -> Self {
        let mut inner = Cursor::new(data);
        inner.set_position(pos);
        Self { inner }
    }
}

impl ResourceSpec for MemBufRes {
    fn type_key(&self) -> &'static str {
        "std.io.Cursor"
    }

    fn is_live(&self) -> bool {
        true
    }
}

/// Named temporary file. Serialization captures contents; reconnection
/// materializes a fresh temp file with the same bytes.
pub struct TempFileRes {
    pub suffix: Option<String>,
    pub handle: Option<tempfile::NamedTempFile>,
}

impl TempFileRes {
    pub fn create(suffix: Option<&str>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        if let Some(sfx) = suffix {
            builder.suffix(sfx);
        }
        let handle = builder.tempfile().context("failed to create temp file")?;
        Ok(Self { suffix: suffix.map(str::to_string), handle: Some(handle) })
    }

    pub fn contents(&self) -> Result<Vec<u8>> {
        match &self.handle {
            Some(h) => std::fs::read(h.path())
                .with_context(|| format!("failed to read {:?}", h.path())),
            None => Ok(Vec::new()),
        }
    }
}

impl ResourceSpec for TempFileRes {
    fn type_key(&self) -> &'static str {
        "tempfile.NamedTempFile"
    }

    fn is_live(&self) -> bool {
        self.handle.is_some()
    }
}

/// Snapshot of a memory-mapped region: origin path plus the mapped bytes
/// read back at extraction time.
pub struct MappedRes {
    pub path: PathBuf,
    pub len: usize,
    pub snapshot: Vec<u8>,
}

impl ResourceSpec for MappedRes {
    fn type_key(&self) -> &'static str {
        "fs.MappedRegion"
    }

    fn is_live(&self) -> bool {
        !self.snapshot.is_empty()
    }
}

// ---------------------------------------------------------------------------
// network
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    Stream,
    Listener,
    Datagram,
}

pub enum SocketHandle {
    Stream(TcpStream),
    Listener(TcpListener),
    Datagram(UdpSocket),
}

pub struct SocketRes {
    pub kind: SocketKind,
    pub local: Option<SocketAddr>,
    pub peer: Option<SocketAddr>,
    pub handle: Option<SocketHandle>,
}

impl SocketRes {
    pub fn from_stream(stream: TcpStream) -> Self {
        let local = stream.local_addr().ok();
        let peer = stream.peer_addr().ok();
        Self {
            kind: SocketKind::Stream,
            local,
            peer,
            handle: Some(SocketHandle::Stream(stream)),
        }
    }

    pub fn from_listener(listener: TcpListener) -> Self {
        let local = listener.local_addr().ok();
        Self {
            kind: SocketKind::Listener,
            local,
            peer: None,
            handle: Some(SocketHandle::Listener(listener)),
        }
    }

    pub fn from_udp(socket: UdpSocket) -> Self {
        let local = socket.local_addr().ok();
        let peer = socket.peer_addr().ok();
        Self {
            kind: SocketKind::Datagram,
            local,
            peer,
            handle: Some(SocketHandle::Datagram(socket)),
        }
    }

    /// Recreate the socket: reconnect streams to the remembered peer, rebind
    /// listeners and datagram sockets to the remembered local address.
    pub fn reconnect(&mut self) -> Result<()> {
        match self.kind {
            SocketKind::Stream => {
                let peer = self
                    .peer
                    .context("stream socket has no remembered peer address")?;
                let stream = TcpStream::connect(peer)
                    .with_context(|| format!("failed to connect to {peer}"))?;
                self.local = stream.local_addr().ok();
                self.handle = Some(SocketHandle::Stream(stream));
            },
            SocketKind::Listener => {
                let local = self
                    .local
                    .context("listener socket has no remembered local address")?;
                let listener = TcpListener::bind(local)
                    .with_context(|| format!("failed to bind {local}"))?;
                self.local = listener.local_addr().ok();
                self.handle = Some(SocketHandle::Listener(listener));
            },
            SocketKind::Datagram => {
                let local = self
                    .local
                    .context("datagram socket has no remembered local address")?;
                let socket = UdpSocket::bind(local)
                    .with_context(|| format!("failed to bind {local}"))?;
                self.local = socket.local_addr().ok();
                self.handle = Some(SocketHandle::Datagram(socket));
            },
        }
        Ok(())
    }
}

impl ResourceSpec for SocketRes {
    fn type_key(&self) -> &'static str {
        match self.kind {
            SocketKind::Stream => "std.net.TcpStream",
            SocketKind::Listener => "std.net.TcpListener",
            SocketKind::Datagram => "std.net.UdpSocket",
        }
    }

    fn is_live(&self) -> bool {
        self.handle.is_some()
    }
}

/// Client-session facade: base URL and default headers travel; the
/// authorization token never does.
pub struct HttpSessionRes {
    pub base_url: String,
    pub headers: Vec<(String, String)>,
    pub auth_token: Option<String>,
}

impl HttpSessionRes {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), headers: Vec::new(), auth_token: None }
    }
}

impl ResourceSpec for HttpSessionRes {
    fn type_key(&self) -> &'static str {
        "http.Session"
    }

    fn is_live(&self) -> bool {
        self.auth_token.is_some()
    }
}

// ---------------------------------------------------------------------------
// databases
// ---------------------------------------------------------------------------

/// SQLite handle; `":memory:"` is the in-memory sentinel.
pub struct SqliteRes {
    pub path: String,
    pub conn: Option<rusqlite::Connection>,
}

pub const SQLITE_MEMORY: &str = ":memory:";

impl SqliteRes {
    pub fn open(path: &str) -> Result<Self> {
        let conn = if path == SQLITE_MEMORY {
            rusqlite::Connection::open_in_memory()
                .context("failed to open in-memory sqlite")?
        } else {
            rusqlite::Connection::open(path)
                .with_context(|| format!("failed to open sqlite at {path}"))?
        };
        Ok(Self { path: path.to_string(), conn: Some(conn) })
    }

    pub fn detached(path: &str) -> Self {
        Self { path: path.to_string(), conn: None }
    }

    pub fn reopen(&mut self) -> Result<()> {
        let fresh = Self::open(&self.path)?;
        self.conn = fresh.conn;
        Ok(())
    }
}

impl ResourceSpec for SqliteRes {
    fn type_key(&self) -> &'static str {
        "rusqlite.Connection"
    }

    fn is_live(&self) -> bool {
        self.conn.is_some()
    }
}

/// Generic network database connection. Topology (host, port, database,
/// user) is stored; the secret is re-supplied at reconnection time.
pub struct DbConnRes {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub secret: Option<String>,
    pub connected: bool,
}

impl DbConnRes {
    pub fn new(host: &str, port: u16, database: &str, user: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            database: database.to_string(),
            user: user.to_string(),
            secret: None,
            connected: false,
        }
    }

    pub fn with_secret(mut self, secret: &str) -> Self {
        self.secret = Some(secret.to_string());
        self.connected = true;
        self
    }
}

impl ResourceSpec for DbConnRes {
    fn type_key(&self) -> &'static str {
        "db.Connection"
    }

    fn is_live(&self) -> bool {
        self.connected
    }
}

// ---------------------------------------------------------------------------
// runtime objects
// ---------------------------------------------------------------------------

/// Generator: factory function plus construction arguments. Reconnection
/// yields a fresh, unstarted instance.
pub struct GeneratorRes {
    pub factory: Value,
    pub args: Vec<Value>,
    pub emitted: u64,
}

impl GeneratorRes {
    pub fn new(factory: Value, args: Vec<Value>) -> Self {
        Self { factory, args, emitted: 0 }
    }

    /// Produce the next item by invoking the factory with the emission
    /// index appended.
    pub fn next(&mut self) -> Result<Value> {
        let Some(r) = self.factory.as_obj() else {
            bail!("generator factory is not callable");
        };
        let mut call_args = self.args.clone();
        call_args.push(Value::Int(self.emitted as i64));
        let out = match &*r.borrow() {
            Obj::Function(f) => f.call(&call_args)?,
            other => bail!("generator factory is a {}", other.kind()),
        };
        self.emitted += 1;
        Ok(out)
    }
}

impl ResourceSpec for GeneratorRes {
    fn type_key(&self) -> &'static str {
        "runtime.Generator"
    }

    fn is_live(&self) -> bool {
        true
    }
}

/// Async task: function identity and arguments; rebuilt unstarted.
pub struct TaskRes {
    pub func: Value,
    pub args: Vec<Value>,
    pub started: bool,
    pub handle: Option<tokio::task::JoinHandle<()>>,
}

impl TaskRes {
    pub fn new(func: Value, args: Vec<Value>) -> Self {
        Self { func, args, started: false, handle: None }
    }

    pub fn func_key(&self) -> Result<String> {
        let Some(r) = self.func.as_obj() else {
            bail!("task target is not a function value");
        };
        match &*r.borrow() {
            Obj::Function(f) => Ok(f.key()),
            other => bail!("task target is a {}", other.kind()),
        }
    }

    /// Spawn onto the ambient tokio runtime, if one is running.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            bail!("task already started");
        }
        let key = self.func_key()?;
        let Some(f) = registry::lookup_fn(&key) else {
            bail!("task target `{key}` is not registered");
        };
        let rt = tokio::runtime::Handle::try_current()
            .context("no tokio runtime available to spawn the task")?;
        let plain: Vec<PlainValue> = self
            .args
            .iter()
            .map(PlainValue::lower)
            .collect::<Result<_>>()
            .context("task arguments must be plain data")?;
        self.handle = Some(rt.spawn(async move {
            let args: Vec<Value> = plain.into_iter().map(PlainValue::lift).collect();
            if let Err(e) = f(&args) {
                tracing::warn!("task target failed: {e:#}");
            }
        }));
        self.started = true;
        Ok(())
    }
}

impl ResourceSpec for TaskRes {
    fn type_key(&self) -> &'static str {
        "tokio.task.Task"
    }

    fn is_live(&self) -> bool {
        self.handle.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Thread,
    Process,
}

/// Worker-pool configuration; workers themselves are never serialized.
pub struct PoolRes {
    pub kind: PoolKind,
    pub size: usize,
}

impl ResourceSpec for PoolRes {
    fn type_key(&self) -> &'static str {
        match self.kind {
            PoolKind::Thread => "pool.ThreadPool",
            PoolKind::Process => "pool.ProcessPool",
        }
    }

    fn is_live(&self) -> bool {
        true
    }
}

/// Child-process handle: the spawn recipe travels, the pid does not.
pub struct ChildRes {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub child: Option<Child>,
}

impl ChildRes {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|s| (*s).to_string()).collect(),
            cwd: None,
            child: None,
        }
    }

    pub fn respawn(&mut self) -> Result<()> {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        let child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.program))?;
        self.child = Some(child);
        Ok(())
    }
}

impl ResourceSpec for ChildRes {
    fn type_key(&self) -> &'static str {
        "process.Child"
    }

    fn is_live(&self) -> bool {
        self.child.is_some()
    }
}

/// Named context variable with an optional current value.
pub struct ContextVarRes {
    pub name: String,
    pub value: Option<Value>,
}

impl ResourceSpec for ContextVarRes {
    fn type_key(&self) -> &'static str {
        "runtime.ContextVar"
    }

    fn is_live(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// observability
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Ok(match s {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" => Self::Warn,
            "error" => Self::Error,
            other => bail!("unknown log level `{other}`"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Stdout,
    Stderr,
    File,
}

#[derive(Debug, Clone)]
pub struct SinkSpec {
    pub kind: SinkKind,
    pub path: Option<String>,
    pub pattern: Option<String>,
}

/// A named logger: level plus attached sinks, rebuilt directly on
/// deserialization (no external half to reconnect).
pub struct LoggerRes {
    pub name: String,
    pub level: LogLevel,
    pub sinks: Vec<SinkSpec>,
}

impl ResourceSpec for LoggerRes {
    fn type_key(&self) -> &'static str {
        "log.Logger"
    }

    fn is_live(&self) -> bool {
        true
    }
}

bitflags! {
    /// Pattern flags remembered alongside the source text.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RegexFlags: u8 {
        const CASE_INSENSITIVE     = 0b0000_0001;
        const MULTI_LINE           = 0b0000_0010;
        const DOT_MATCHES_NEW_LINE = 0b0000_0100;
        const IGNORE_WHITESPACE    = 0b0000_1000;
        const SWAP_GREED           = 0b0001_0000;
        const UNICODE_DISABLED     = 0b0010_0000;
    }
}

/// Compiled pattern; rebuilt live on deserialization from source + flags.
pub struct RegexRes {
    pub source: String,
    pub flags: RegexFlags,
    pub compiled: regex::Regex,
}

impl RegexRes {
    pub fn compile(source: &str, flags: RegexFlags) -> Result<Self> {
        let compiled = regex::RegexBuilder::new(source)
            .case_insensitive(flags.contains(RegexFlags::CASE_INSENSITIVE))
            .multi_line(flags.contains(RegexFlags::MULTI_LINE))
            .dot_matches_new_line(flags.contains(RegexFlags::DOT_MATCHES_NEW_LINE))
            .ignore_whitespace(flags.contains(RegexFlags::IGNORE_WHITESPACE))
            .swap_greed(flags.contains(RegexFlags::SWAP_GREED))
            .unicode(!flags.contains(RegexFlags::UNICODE_DISABLED))
            .build()
            .with_context(|| format!("failed to compile pattern `{source}`"))?;
        Ok(Self { source: source.to_string(), flags, compiled })
    }

    /// Run the pattern and snapshot the first match.
    pub fn find(&self, haystack: &str) -> Option<RegexMatchRes> {
        let caps = self.compiled.captures(haystack)?;
        let whole = caps.get(0)?;
        let groups = (1..caps.len())
            .map(|i| caps.get(i).map(|m| (m.start(), m.end())))
            .collect();
        Some(RegexMatchRes {
            pattern_source: self.source.clone(),
            flags: self.flags,
            haystack: haystack.to_string(),
            start: whole.start(),
            end: whole.end(),
            groups,
        })
    }
}

impl ResourceSpec for RegexRes {
    fn type_key(&self) -> &'static str {
        "regex.Regex"
    }

    fn is_live(&self) -> bool {
        true
    }
}

/// Match snapshot: the haystack and offsets. Reconnection re-runs the
/// pattern against the stored haystack for a fresh, verified match.
pub struct RegexMatchRes {
    pub pattern_source: String,
    pub flags: RegexFlags,
    pub haystack: String,
    pub start: usize,
    pub end: usize,
    pub groups: Vec<Option<(usize, usize)>>,
}

impl RegexMatchRes {
    pub fn matched(&self) -> &str {
        &self.haystack[self.start..self.end]
    }

    pub fn group(&self, idx: usize) -> Option<&str> {
        if idx == 0 {
            return Some(self.matched());
        }
        let (start, end) = (*self.groups.get(idx - 1)?)?;
        Some(&self.haystack[start..end])
    }
}

impl ResourceSpec for RegexMatchRes {
    fn type_key(&self) -> &'static str {
        "regex.Match"
    }

    fn is_live(&self) -> bool {
        true
    }
}
