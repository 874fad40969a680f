//! Shared helpers for integration tests.
//!
//! Runs a small in-process RESP server so the tests need no external
//! server. Requests are decoded with the crate's own `ReplyReader`; data
//! lives in one in-memory store shared by every connection.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use respool::buffer::ByteBuffer;
use respool::resp::{Reply, ReplyReader};
use respool::{Client, ConnectionConfig};

/// Global counter for generating unique key prefixes per test.
static TEST_ID: AtomicUsize = AtomicUsize::new(0);

/// Return a unique prefix for test keys to avoid collisions between tests.
pub fn test_prefix() -> String {
    let id = TEST_ID.fetch_add(1, Ordering::Relaxed);
    format!("respool_test_{}_{}", std::process::id(), id)
}

/// Install a fmt subscriber driven by `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// ── Store ──────────────────────────────────────────────────────────

enum Value {
    Str(Bytes),
    List(VecDeque<Bytes>),
    /// Insertion-ordered so replies are deterministic.
    Set(Vec<Bytes>),
    Hash(Vec<(Bytes, Bytes)>),
}

type Store = HashMap<(u16, Bytes), Value>;

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

// ── Server ─────────────────────────────────────────────────────────

/// Handle to a running mock server.
pub struct MockServer {
    pub addr: String,
    store: Arc<Mutex<Store>>,
    accepted: Arc<AtomicUsize>,
    log: Arc<Mutex<Vec<String>>>,
}

impl MockServer {
    pub async fn start() -> Self {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let store = Arc::new(Mutex::new(Store::new()));
        let accepted = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));

        let (s, a, l) = (Arc::clone(&store), Arc::clone(&accepted), Arc::clone(&log));
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                a.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(socket, Arc::clone(&s), Arc::clone(&l)));
            }
        });

        Self {
            addr,
            store,
            accepted,
            log,
        }
    }

    pub fn config(&self) -> ConnectionConfig {
        ConnectionConfig::from_addr(&self.addr).unwrap()
    }

    pub async fn client(&self) -> Client {
        Client::connect(self.config()).await.unwrap()
    }

    /// Number of TCP connections accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// How many times `command` has been received, across connections.
    pub fn count(&self, command: &str) -> usize {
        self.log.lock().iter().filter(|c| c.as_str() == command).count()
    }

    /// Total commands received.
    pub fn total_commands(&self) -> usize {
        self.log.lock().len()
    }
}

async fn serve(mut socket: TcpStream, store: Arc<Mutex<Store>>, log: Arc<Mutex<Vec<String>>>) {
    let mut rbuf = ByteBuffer::default();
    let mut db = 0u16;
    loop {
        let request = match ReplyReader::new(&mut socket, &mut rbuf).read_reply().await {
            Ok(Reply::Array(Some(items))) => items,
            _ => return,
        };
        let args: Vec<Bytes> = request.into_iter().filter_map(Reply::into_bytes).collect();
        let Some(name) = args.first() else { return };
        let name = String::from_utf8_lossy(name).to_ascii_uppercase();
        log.lock().push(name.clone());

        let reply = match name.as_str() {
            "SELECT" => match args.get(1).and_then(|a| parse_int(a)) {
                Some(n) if (0..16).contains(&n) => {
                    db = n as u16;
                    Reply::Status("OK".into())
                }
                _ => Reply::Error("ERR DB index is out of range".into()),
            },
            "GARBAGE" => {
                let _ = socket.write_all(b"?garbage\r\n").await;
                continue;
            }
            "BLPOP" | "BRPOP" => blocking_pop(&store, db, &name, &args[1..]).await,
            _ => {
                let mut store = store.lock();
                execute(&mut store, db, &name, &args[1..])
            }
        };

        let mut out = ByteBuffer::default();
        encode_reply(&mut out, &reply);
        if socket.write_all(out.as_slice()).await.is_err() {
            return;
        }
    }
}

fn encode_reply(out: &mut ByteBuffer, reply: &Reply) {
    match reply {
        Reply::Status(s) => {
            out.write_u8(b'+');
            out.write_slice(s.as_bytes());
            out.write_crlf();
        }
        Reply::Error(s) => {
            out.write_u8(b'-');
            out.write_slice(s.as_bytes());
            out.write_crlf();
        }
        Reply::Integer(n) => {
            out.write_u8(b':');
            out.write_slice(n.to_string().as_bytes());
            out.write_crlf();
        }
        Reply::Bulk(Some(b)) => out.write_bytes(b),
        Reply::Bulk(None) => out.write_slice(b"$-1\r\n"),
        Reply::Array(Some(items)) => {
            out.write_u8(b'*');
            out.write_unsigned_int(items.len());
            for item in items {
                encode_reply(out, item);
            }
        }
        Reply::Array(None) => out.write_slice(b"*-1\r\n"),
    }
}

fn parse_int(b: &[u8]) -> Option<i64> {
    std::str::from_utf8(b).ok()?.parse().ok()
}

fn bulk(b: &Bytes) -> Reply {
    Reply::Bulk(Some(b.clone()))
}

fn ok() -> Reply {
    Reply::Status("OK".into())
}

fn arity(name: &str) -> Reply {
    Reply::Error(format!(
        "ERR wrong number of arguments for '{}' command",
        name.to_ascii_lowercase()
    ))
}

/// Resolve inclusive, possibly negative, list indexes against `len`.
fn range_indices(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        None
    } else {
        Some((start as usize, stop as usize))
    }
}

/// Poll the store until a listed key has an element or the timeout passes.
async fn blocking_pop(store: &Mutex<Store>, db: u16, name: &str, args: &[Bytes]) -> Reply {
    let Some((timeout, keys)) = args.split_last() else {
        return arity(name);
    };
    if keys.is_empty() {
        return arity(name);
    }
    let Some(timeout) = parse_int(timeout).filter(|t| *t >= 0) else {
        return Reply::Error("ERR timeout is not an integer or out of range".into());
    };
    let deadline = (timeout > 0).then(|| Instant::now() + Duration::from_secs(timeout as u64));

    loop {
        {
            let mut store = store.lock();
            for key in keys {
                match store.get_mut(&(db, key.clone())) {
                    Some(Value::List(list)) => {
                        let popped = if name == "BLPOP" {
                            list.pop_front()
                        } else {
                            list.pop_back()
                        };
                        if let Some(value) = popped {
                            if list.is_empty() {
                                store.remove(&(db, key.clone()));
                            }
                            return Reply::Array(Some(vec![bulk(key), Reply::Bulk(Some(value))]));
                        }
                    }
                    Some(_) => return Reply::Error(WRONGTYPE.into()),
                    None => {}
                }
            }
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Reply::Array(None);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn execute(store: &mut Store, db: u16, name: &str, args: &[Bytes]) -> Reply {
    let key = |i: usize| (db, args[i].clone());
    match (name, args.len()) {
        ("PING", 0) => Reply::Status("PONG".into()),
        ("SET", 2) | ("SETEX", 3) => {
            if name == "SETEX" && parse_int(&args[1]).is_none() {
                return Reply::Error("ERR value is not an integer or out of range".into());
            }
            let value = args[args.len() - 1].clone();
            store.insert(key(0), Value::Str(value));
            ok()
        }
        ("SETNX", 2) => {
            if store.contains_key(&key(0)) {
                Reply::Integer(0)
            } else {
                store.insert(key(0), Value::Str(args[1].clone()));
                Reply::Integer(1)
            }
        }
        ("GET", 1) => match store.get(&key(0)) {
            Some(Value::Str(v)) => bulk(v),
            Some(_) => Reply::Error(WRONGTYPE.into()),
            None => Reply::Bulk(None),
        },
        ("MGET", n) if n > 0 => Reply::Array(Some(
            args.iter()
                .map(|k| match store.get(&(db, k.clone())) {
                    Some(Value::Str(v)) => bulk(v),
                    _ => Reply::Bulk(None),
                })
                .collect(),
        )),
        ("DEL", n) if n > 0 => {
            let removed = args
                .iter()
                .filter(|k| store.remove(&(db, (*k).clone())).is_some())
                .count();
            Reply::Integer(removed as i64)
        }
        ("INCR", 1) => incr_by(store, key(0), 1),
        ("EXPIRE", 2) => match parse_int(&args[1]) {
            Some(_) => Reply::Integer(i64::from(store.contains_key(&key(0)))),
            None => Reply::Error("ERR value is not an integer or out of range".into()),
        },
        ("LPUSH", n) | ("RPUSH", n) if n >= 2 => {
            let entry = store
                .entry(key(0))
                .or_insert_with(|| Value::List(VecDeque::new()));
            let Value::List(list) = entry else {
                return Reply::Error(WRONGTYPE.into());
            };
            for v in &args[1..] {
                if name == "LPUSH" {
                    list.push_front(v.clone());
                } else {
                    list.push_back(v.clone());
                }
            }
            Reply::Integer(list.len() as i64)
        }
        ("LRANGE", 3) | ("LTRIM", 3) => {
            let (Some(start), Some(stop)) = (parse_int(&args[1]), parse_int(&args[2])) else {
                return Reply::Error("ERR value is not an integer or out of range".into());
            };
            let list = match store.get_mut(&key(0)) {
                Some(Value::List(list)) => list,
                Some(_) => return Reply::Error(WRONGTYPE.into()),
                None if name == "LRANGE" => return Reply::Array(Some(Vec::new())),
                None => return ok(),
            };
            let range = range_indices(list.len(), start, stop);
            if name == "LRANGE" {
                let items = match range {
                    Some((s, e)) => list.range(s..=e).map(bulk).collect(),
                    None => Vec::new(),
                };
                return Reply::Array(Some(items));
            }
            match range {
                Some((s, e)) => {
                    list.truncate(e + 1);
                    list.drain(..s);
                }
                None => list.clear(),
            }
            if list.is_empty() {
                store.remove(&key(0));
            }
            ok()
        }
        ("SADD", n) if n >= 2 => {
            let entry = store.entry(key(0)).or_insert_with(|| Value::Set(Vec::new()));
            let Value::Set(set) = entry else {
                return Reply::Error(WRONGTYPE.into());
            };
            let mut added = 0;
            for m in &args[1..] {
                if !set.contains(m) {
                    set.push(m.clone());
                    added += 1;
                }
            }
            Reply::Integer(added)
        }
        ("SMEMBERS", 1) => match store.get(&key(0)) {
            Some(Value::Set(set)) => Reply::Array(Some(set.iter().map(bulk).collect())),
            Some(_) => Reply::Error(WRONGTYPE.into()),
            None => Reply::Array(Some(Vec::new())),
        },
        ("HMSET", n) if n >= 3 && n % 2 == 1 => {
            let entry = store.entry(key(0)).or_insert_with(|| Value::Hash(Vec::new()));
            let Value::Hash(hash) = entry else {
                return Reply::Error(WRONGTYPE.into());
            };
            for pair in args[1..].chunks(2) {
                hash_set(hash, &pair[0], pair[1].clone());
            }
            ok()
        }
        ("HGETALL", 1) => match store.get(&key(0)) {
            Some(Value::Hash(hash)) => Reply::Array(Some(
                hash.iter().flat_map(|(f, v)| [bulk(f), bulk(v)]).collect(),
            )),
            Some(_) => Reply::Error(WRONGTYPE.into()),
            None => Reply::Array(Some(Vec::new())),
        },
        ("HINCRBY", 3) => {
            let Some(inc) = parse_int(&args[2]) else {
                return Reply::Error("ERR value is not an integer or out of range".into());
            };
            let entry = store.entry(key(0)).or_insert_with(|| Value::Hash(Vec::new()));
            let Value::Hash(hash) = entry else {
                return Reply::Error(WRONGTYPE.into());
            };
            let current = hash
                .iter()
                .find(|(f, _)| f == &args[1])
                .map(|(_, v)| parse_int(v));
            let current = match current {
                None => 0,
                Some(Some(n)) => n,
                Some(None) => return Reply::Error("ERR hash value is not an integer".into()),
            };
            let next = current + inc;
            hash_set(hash, &args[1], Bytes::from(next.to_string()));
            Reply::Integer(next)
        }
        (
            "PING" | "SET" | "SETEX" | "SETNX" | "GET" | "MGET" | "DEL" | "INCR" | "EXPIRE"
            | "LPUSH" | "RPUSH" | "LRANGE" | "LTRIM" | "SADD" | "SMEMBERS" | "HMSET"
            | "HGETALL" | "HINCRBY",
            _,
        ) => arity(name),
        _ => Reply::Error(format!("ERR unknown command '{name}'")),
    }
}

fn incr_by(store: &mut Store, key: (u16, Bytes), inc: i64) -> Reply {
    let current = match store.get(&key) {
        None => 0,
        Some(Value::Str(v)) => match parse_int(v) {
            Some(n) => n,
            None => return Reply::Error("ERR value is not an integer or out of range".into()),
        },
        Some(_) => return Reply::Error(WRONGTYPE.into()),
    };
    let next = current + inc;
    store.insert(key, Value::Str(Bytes::from(next.to_string())));
    Reply::Integer(next)
}

fn hash_set(hash: &mut Vec<(Bytes, Bytes)>, field: &Bytes, value: Bytes) {
    match hash.iter_mut().find(|(f, _)| f == field) {
        Some((_, v)) => *v = value,
        None => hash.push((field.clone(), value)),
    }
}
