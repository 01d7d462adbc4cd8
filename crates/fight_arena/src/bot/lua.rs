//! Sandboxed Lua bots.
//!
//! Each bot gets its own interpreter with only the `table`, `string` and
//! `math` libraries, a heap limit and an instruction-count hook that aborts
//! execution past a wall-clock deadline. `log(...)` replaces `print`.
//! `pcall` and `xpcall` are removed, so nothing inside the bot can catch the
//! hook's error and keep running.
//!
//! The source must evaluate to a function taking the state snapshot and
//! returning `{ position = n }`.

use super::{Answer, Bot, BotError};
use crate::config::SandboxLimits;
use fight_tictactoe::StateView;
use mlua::{
    Function, HookTriggers, Lua, LuaOptions, LuaSerdeExt, MultiValue, RegistryKey, StdLib, Value,
    VmState,
};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Instructions between deadline checks.
const HOOK_INTERVAL: u32 = 1_000;

/// Globals removed from the base library.
const BLOCKED_GLOBALS: [&str; 8] = [
    "dofile",
    "loadfile",
    "load",
    "require",
    "collectgarbage",
    "print",
    "pcall",
    "xpcall",
];

#[derive(Debug, Deserialize)]
struct RawAnswer {
    position: f64,
}

/// A compiled Lua decision function in its own interpreter.
pub struct LuaBot {
    name: String,
    lua: Mutex<Lua>,
    decide: RegistryKey,
    timeout: Duration,
}

impl std::fmt::Debug for LuaBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuaBot")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl LuaBot {
    /// Evaluates `source` in a fresh sandbox and keeps the resulting function.
    ///
    /// Both a bare function expression (`function(state) ... end`) and a
    /// chunk that returns one are accepted.
    ///
    /// # Errors
    ///
    /// [`BotError::Compile`] when the source fails to parse, raises, runs
    /// out of memory or evaluates to something other than a function;
    /// [`BotError::Timeout`] when evaluation passes the deadline.
    #[instrument(skip(source, limits), fields(len = source.len()))]
    pub fn compile(name: &str, source: &str, limits: &SandboxLimits) -> Result<Self, BotError> {
        let lua = sandbox(limits).map_err(|e| BotError::Compile(e.to_string()))?;
        let timeout = limits.timeout();

        let chunk = match lua
            .load(format!("return {source}"))
            .set_name(name)
            .into_function()
        {
            Ok(chunk) => chunk,
            Err(_) => lua
                .load(source)
                .set_name(name)
                .into_function()
                .map_err(|e| BotError::Compile(e.to_string()))?,
        };

        let deadline = Deadline::arm(&lua, timeout);
        let evaluated = chunk.call::<Value>(());
        let expired = deadline.disarm(&lua);

        let value = match evaluated {
            Ok(value) => value,
            Err(_) if expired => return Err(BotError::Timeout(limits.timeout_ms)),
            Err(e) => return Err(BotError::Compile(e.to_string())),
        };

        let decide = match value {
            Value::Function(decide) => decide,
            other => {
                return Err(BotError::Compile(format!(
                    "source evaluated to a {}, expected a function",
                    other.type_name()
                )));
            }
        };
        let decide = lua
            .create_registry_value(decide)
            .map_err(|e| BotError::Compile(e.to_string()))?;

        debug!(name, "Compiled Lua bot");
        Ok(Self {
            name: name.to_string(),
            lua: Mutex::new(lua),
            decide,
            timeout,
        })
    }

    fn run(&self, state: &StateView) -> Result<Answer, BotError> {
        let lua = self.lua.lock().unwrap_or_else(PoisonError::into_inner);
        let decide: Function = lua
            .registry_value(&self.decide)
            .map_err(|e| BotError::Runtime(e.to_string()))?;
        let input = lua
            .to_value(state)
            .map_err(|e| BotError::Runtime(format!("could not build state: {e}")))?;

        let deadline = Deadline::arm(&lua, self.timeout);
        let result = decide.call::<Value>(input);
        let expired = deadline.disarm(&lua);

        let value = match result {
            Ok(value) => value,
            Err(_) if expired => return Err(BotError::Timeout(self.timeout.as_millis() as u64)),
            Err(e) => return Err(BotError::Runtime(e.to_string())),
        };

        let raw: RawAnswer = lua
            .from_value(value)
            .map_err(|e| BotError::MalformedAnswer(e.to_string()))?;
        to_cell(raw.position).map(|position| Answer { position })
    }
}

impl Bot for LuaBot {
    fn label(&self) -> &str {
        &self.name
    }

    fn think(&self, state: StateView) -> Result<Answer, BotError> {
        self.run(&state)
    }
}

/// Deadline for one evaluation. Once the hook has fired it keeps firing,
/// and only a fired hook turns an error into a timeout.
#[derive(Debug, Clone)]
struct Deadline {
    at: Instant,
    expired: Arc<AtomicBool>,
}

impl Deadline {
    /// Installs the instruction hook on `lua` for `limit` from now.
    fn arm(lua: &Lua, limit: Duration) -> Self {
        let deadline = Self {
            at: Instant::now() + limit,
            expired: Arc::new(AtomicBool::new(false)),
        };
        let hook = deadline.clone();
        lua.set_hook(
            HookTriggers::new().every_nth_instruction(HOOK_INTERVAL),
            move |_lua, _debug| {
                if hook.expired.load(Ordering::Relaxed) || Instant::now() >= hook.at {
                    hook.expired.store(true, Ordering::Relaxed);
                    Err(mlua::Error::runtime("time limit exceeded"))
                } else {
                    Ok(VmState::Continue)
                }
            },
        );
        deadline
    }

    /// Removes the hook and reports whether it ever fired.
    fn disarm(self, lua: &Lua) -> bool {
        lua.remove_hook();
        self.expired.load(Ordering::Relaxed)
    }
}

/// A fresh interpreter with the restricted library set.
fn sandbox(limits: &SandboxLimits) -> mlua::Result<Lua> {
    let lua = Lua::new_with(
        StdLib::TABLE | StdLib::STRING | StdLib::MATH,
        LuaOptions::default(),
    )?;
    lua.set_memory_limit(limits.memory_limit_bytes)?;

    let globals = lua.globals();
    for name in BLOCKED_GLOBALS {
        globals.set(name, Value::Nil)?;
    }

    let log = lua.create_function(|_, args: MultiValue| {
        let line = args
            .iter()
            .map(|value| match value {
                Value::String(s) => s.to_string_lossy().to_string(),
                other => format!("{other:?}"),
            })
            .collect::<Vec<_>>()
            .join("\t");
        debug!(target: "fight_arena::bot::lua", "{line}");
        Ok(())
    })?;
    globals.set("log", log)?;

    Ok(lua)
}

/// Accepts only finite integral numbers.
fn to_cell(position: f64) -> Result<i64, BotError> {
    if position.is_finite() && position.fract() == 0.0 && position.abs() <= i64::MAX as f64 {
        Ok(position as i64)
    } else {
        Err(BotError::MalformedAnswer(format!(
            "position {position} is not an integer"
        )))
    }
}
