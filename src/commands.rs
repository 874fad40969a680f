//! Convenience commands on [`Client`].
//!
//! Each one marshals its arguments, runs through [`Client::execute`] and maps
//! the reply shape onto a plain Rust value. An unexpected shape is
//! [`Error::Type`]; the connection is returned as usual.

use bytes::Bytes;

use crate::client::{Client, PopDirection, Popped};
use crate::error::{Error, Result};
use crate::resp::types::{Argument, Reply};

impl Client {
    /// `PING`, expecting `+PONG`.
    pub async fn ping(&self) -> Result<()> {
        match self.execute("PING", &[]).await? {
            Reply::Status(ref s) if s == "PONG" => Ok(()),
            other => Err(unexpected("PING", &other)),
        }
    }

    // ── Strings ────────────────────────────────────────────────────

    /// `GET key`. A missing key is [`Error::NotFound`].
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        match self.execute("GET", &[key.into()]).await? {
            Reply::Bulk(Some(value)) => Ok(value),
            Reply::Bulk(None) => Err(Error::NotFound),
            other => Err(unexpected("GET", &other)),
        }
    }

    /// `GET key` decoded as UTF-8.
    pub async fn get_string(&self, key: &str) -> Result<String> {
        let value = self.get(key).await?;
        into_string(value)
    }

    /// `SET key value`.
    pub async fn set(&self, key: &str, value: impl Into<Argument>) -> Result<()> {
        let reply = self.execute("SET", &[key.into(), value.into()]).await?;
        expect_ok("SET", reply)
    }

    /// `SETEX key seconds value`.
    pub async fn setex(&self, key: &str, seconds: u64, value: impl Into<Argument>) -> Result<()> {
        let reply = self
            .execute("SETEX", &[key.into(), seconds_arg(seconds)?, value.into()])
            .await?;
        expect_ok("SETEX", reply)
    }

    /// `SETNX key value`. True when the key was set.
    pub async fn setnx(&self, key: &str, value: impl Into<Argument>) -> Result<bool> {
        let reply = self.execute("SETNX", &[key.into(), value.into()]).await?;
        Ok(expect_int("SETNX", reply)? == 1)
    }

    /// `DEL key [key ...]`. Returns the number of keys removed.
    pub async fn del(&self, keys: &[&str]) -> Result<i64> {
        if keys.is_empty() {
            return Err(Error::Argument("DEL requires at least one key".into()));
        }
        let args: Vec<Argument> = keys.iter().map(|&k| k.into()).collect();
        expect_int("DEL", self.execute("DEL", &args).await?)
    }

    /// `MGET key [key ...]`, one entry per key, `None` where it is missing.
    pub async fn mget(&self, keys: &[&str]) -> Result<Vec<Option<Bytes>>> {
        if keys.is_empty() {
            return Err(Error::Argument("MGET requires at least one key".into()));
        }
        let args: Vec<Argument> = keys.iter().map(|&k| k.into()).collect();
        expect_array("MGET", self.execute_isolated("MGET", &args).await?)?
            .into_iter()
            .map(|item| match item {
                Reply::Bulk(value) => Ok(value),
                other => Err(unexpected("MGET element", &other)),
            })
            .collect()
    }

    /// [`mget`](Self::mget) decoded as UTF-8.
    pub async fn mget_strings(&self, keys: &[&str]) -> Result<Vec<Option<String>>> {
        self.mget(keys)
            .await?
            .into_iter()
            .map(|value| value.map(into_string).transpose())
            .collect()
    }

    // ── Lists ──────────────────────────────────────────────────────

    /// `LPUSH key value [value ...]`. Returns the new list length.
    pub async fn lpush(&self, key: &str, values: &[Argument]) -> Result<i64> {
        self.push("LPUSH", key, values).await
    }

    /// `RPUSH key value [value ...]`. Returns the new list length.
    pub async fn rpush(&self, key: &str, values: &[Argument]) -> Result<i64> {
        self.push("RPUSH", key, values).await
    }

    async fn push(&self, command: &str, key: &str, values: &[Argument]) -> Result<i64> {
        if values.is_empty() {
            return Err(Error::Argument(format!("{command} requires at least one value")));
        }
        let mut args = Vec::with_capacity(values.len() + 1);
        args.push(Argument::from(key));
        args.extend_from_slice(values);
        expect_int(command, self.execute(command, &args).await?)
    }

    /// `LTRIM key start stop`.
    pub async fn ltrim(&self, key: &str, start: i64, stop: i64) -> Result<()> {
        let reply = self
            .execute("LTRIM", &[key.into(), Argument::int(start), Argument::int(stop)])
            .await?;
        expect_ok("LTRIM", reply)
    }

    /// `LRANGE key start stop`.
    pub async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Bytes>> {
        let reply = self
            .execute_isolated("LRANGE", &[key.into(), Argument::int(start), Argument::int(stop)])
            .await?;
        bulk_list("LRANGE", reply)
    }

    /// `BLPOP key [key ...] timeout`.
    pub async fn blpop(&self, keys: &[&str], timeout_secs: u64) -> Result<Option<Popped>> {
        self.block_pop(PopDirection::Left, keys, timeout_secs).await
    }

    /// `BRPOP key [key ...] timeout`.
    pub async fn brpop(&self, keys: &[&str], timeout_secs: u64) -> Result<Option<Popped>> {
        self.block_pop(PopDirection::Right, keys, timeout_secs).await
    }

    // ── Sets ───────────────────────────────────────────────────────

    /// `SADD key member`. True when the member was new.
    pub async fn sadd(&self, key: &str, member: impl Into<Argument>) -> Result<bool> {
        let reply = self.execute("SADD", &[key.into(), member.into()]).await?;
        Ok(expect_int("SADD", reply)? > 0)
    }

    /// `SMEMBERS key`, in server order.
    pub async fn smembers(&self, key: &str) -> Result<Vec<Bytes>> {
        let reply = self.execute_isolated("SMEMBERS", &[key.into()]).await?;
        bulk_list("SMEMBERS", reply)
    }

    // ── Hashes ─────────────────────────────────────────────────────

    /// `HMSET key field value [field value ...]` from ordered pairs.
    pub async fn hmset(&self, key: &str, pairs: &[(&str, Argument)]) -> Result<()> {
        if pairs.is_empty() {
            return Err(Error::Argument("HMSET requires at least one field".into()));
        }
        let mut args = Vec::with_capacity(pairs.len() * 2 + 1);
        args.push(Argument::from(key));
        for (field, value) in pairs {
            args.push(Argument::from(*field));
            args.push(value.clone());
        }
        expect_ok("HMSET", self.execute("HMSET", &args).await?)
    }

    /// `HGETALL key` as `(field, value)` pairs. A missing key gives an empty list.
    pub async fn hgetall(&self, key: &str) -> Result<Vec<(String, Bytes)>> {
        let items = bulk_list("HGETALL", self.execute_isolated("HGETALL", &[key.into()]).await?)?;
        if items.len() % 2 != 0 {
            return Err(Error::Type(format!(
                "HGETALL returned an odd number of elements: {}",
                items.len()
            )));
        }
        let mut pairs = Vec::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
            pairs.push((into_string(field)?, value));
        }
        Ok(pairs)
    }

    /// `EXPIRE key seconds`. True when the timeout was set.
    pub async fn expire(&self, key: &str, seconds: u64) -> Result<bool> {
        let reply = self.execute("EXPIRE", &[key.into(), seconds_arg(seconds)?]).await?;
        Ok(expect_int("EXPIRE", reply)? == 1)
    }
}

// ── Reply mapping ──────────────────────────────────────────────────

fn unexpected(command: &str, reply: &Reply) -> Error {
    Error::Type(format!("unexpected {command} reply: {}", reply.type_name()))
}

fn expect_ok(command: &str, reply: Reply) -> Result<()> {
    if reply.is_ok() {
        Ok(())
    } else {
        Err(unexpected(command, &reply))
    }
}

fn expect_int(command: &str, reply: Reply) -> Result<i64> {
    reply.as_int().ok_or_else(|| unexpected(command, &reply))
}

fn expect_array(command: &str, reply: Reply) -> Result<Vec<Reply>> {
    match reply {
        Reply::Array(Some(items)) => Ok(items),
        other => Err(unexpected(command, &other)),
    }
}

/// Array of non-null bulks. A null array reads as empty.
fn bulk_list(command: &str, reply: Reply) -> Result<Vec<Bytes>> {
    let items = match reply {
        Reply::Array(None) => return Ok(Vec::new()),
        other => expect_array(command, other)?,
    };
    items
        .into_iter()
        .map(|item| match item {
            Reply::Bulk(Some(b)) => Ok(b),
            other => Err(unexpected(command, &other)),
        })
        .collect()
}

fn into_string(value: Bytes) -> Result<String> {
    String::from_utf8(value.to_vec()).map_err(|e| Error::Type(format!("value is not UTF-8: {e}")))
}

fn seconds_arg(seconds: u64) -> Result<Argument> {
    i64::try_from(seconds)
        .map(Argument::int)
        .map_err(|_| Error::Argument(format!("seconds out of range: {seconds}")))
}

// ── Tests ──────────────────────────────────────────────────────────
