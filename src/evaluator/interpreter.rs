//! Asynchronous tree-walking interpreter.
//!
//! Evaluation is a chain of boxed futures so that script recursion and host
//! calls can suspend. Every statement costs one step; every
//! `yield_interval` steps the interpreter yields to the scheduler and checks
//! whether its attempt has been abandoned, which keeps tight loops
//! observable by whoever is racing the execution.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::host::{HostError, HostFunction};
use super::members::{
    call_builtin_method, enumerable_keys, get_property, has_builtin_method, set_property,
};
use super::operators::apply_binary;
use super::scope::{Scope, ScopeError, WeakScope};
use super::type_coercion::{to_f64, to_string, truthy, type_of};
use super::value::{Callable, Closure, ErrorKind, PropertyMap, Value};
use crate::core::generation::GenerationLease;
use crate::script::{
    AssignOp, DeclKind, Expr, FunctionDecl, IterationKind, LogicalOp, Stmt, UnaryOp,
    UpdateOp,
};

/// Why evaluation stopped short of a normal completion.
#[derive(Debug, Clone)]
pub enum Interrupt {
    /// A value thrown by script code or a failing builtin.
    Throw(Value),
    /// The attempt was abandoned; unwind without running more user code.
    Abandoned,
    /// The step budget ran out.
    BudgetExhausted { steps: u64 },
}

pub type EvalResult<T> = Result<T, Interrupt>;

/// Statement completion.
#[derive(Debug, Clone)]
enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Script call depth beyond which a `RangeError` is thrown.
    pub max_call_depth: usize,
    /// Statements executed before the run is cut off. `None` is unbounded.
    pub max_steps: Option<u64>,
    /// Statements between cooperative yields.
    pub yield_interval: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_call_depth: 100,
            max_steps: None,
            yield_interval: 1000,
        }
    }
}

enum Place {
    Binding(String),
    Property { object: Value, key: Value },
}

struct CallDepth<'a>(&'a AtomicUsize);

/// Clears every captured scope chain when a run ends, however it ends.
struct ReleaseCaptured<'a>(&'a Interpreter);

impl Drop for ReleaseCaptured<'_> {
    fn drop(&mut self) {
        let captured = std::mem::take(&mut *self.0.captured.lock());
        for scope in captured.iter().filter_map(WeakScope::upgrade) {
            scope.clear_chain();
        }
    }
}

impl Drop for CallDepth<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

fn throw<T>(kind: ErrorKind, message: impl Into<String>) -> EvalResult<T> {
    Err(Interrupt::Throw(Value::error(kind, message)))
}

/// Human-readable name of a callee expression for error messages.
fn describe_callee(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member { object, property } => format!("{}.{}", describe_callee(object), property),
        Expr::Index { object, .. } => format!("{}[...]", describe_callee(object)),
        _ => "expression".to_string(),
    }
}

/// Names declared with `var` anywhere in `stmts`, excluding nested functions.
fn collect_var_names(stmts: &[Stmt], out: &mut Vec<String>) {
    for stmt in stmts {
        collect_var_names_in(stmt, out);
    }
}

fn collect_var_names_in(stmt: &Stmt, out: &mut Vec<String>) {
    match stmt {
        Stmt::Decl {
            kind: DeclKind::Var,
            declarators,
        } => out.extend(declarators.iter().map(|(name, _)| name.clone())),
        Stmt::If {
            consequent,
            alternate,
            ..
        } => {
            collect_var_names_in(consequent, out);
            if let Some(alt) = alternate {
                collect_var_names_in(alt, out);
            }
        }
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } => collect_var_names_in(body, out),
        Stmt::For { init, body, .. } => {
            if let Some(init) = init {
                collect_var_names_in(init, out);
            }
            collect_var_names_in(body, out);
        }
        Stmt::ForEach {
            kind, name, body, ..
        } => {
            if *kind == DeclKind::Var {
                out.push(name.clone());
            }
            collect_var_names_in(body, out);
        }
        Stmt::Block(stmts) => collect_var_names(stmts, out),
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            collect_var_names(block, out);
            if let Some(handler) = handler {
                collect_var_names(&handler.body, out);
            }
            if let Some(finalizer) = finalizer {
                collect_var_names(finalizer, out);
            }
        }
        _ => {}
    }
}

fn scope_error(err: ScopeError, name: &str) -> Interrupt {
    let value = match err {
        ScopeError::Undeclared => {
            Value::error(ErrorKind::ReferenceError, format!("{} is not defined", name))
        }
        ScopeError::Constant => {
            Value::error(ErrorKind::TypeError, "Assignment to constant variable.")
        }
        ScopeError::Redeclared => Value::error(
            ErrorKind::SyntaxError,
            format!("Identifier '{}' has already been declared", name),
        ),
    };
    Interrupt::Throw(value)
}

/// Item `index` of a `for...of`/`for...in` walk. Arrays are read live.
fn iteration_item(snapshot: &Option<Vec<Value>>, target: &Value, index: usize) -> Option<Value> {
    match (snapshot, target) {
        (Some(items), _) => items.get(index).cloned(),
        (None, Value::Array(items)) => items.lock().get(index).cloned(),
        _ => None,
    }
}

/// Executes one attempt's script. One interpreter per attempt.
pub struct Interpreter {
    limits: Limits,
    cancel: CancellationToken,
    lease: Option<GenerationLease>,
    steps: AtomicU64,
    depth: AtomicUsize,
    /// Scopes closed over by script closures during the current run.
    captured: Mutex<Vec<WeakScope>>,
}

impl Interpreter {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            cancel: CancellationToken::new(),
            lease: None,
            steps: AtomicU64::new(0),
            depth: AtomicUsize::new(0),
            captured: Mutex::new(Vec::new()),
        }
    }

    /// Unwind at the next yield point once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Unwind at the next yield point once `lease` goes stale.
    pub fn with_lease(mut self, lease: GenerationLease) -> Self {
        self.lease = Some(lease);
        self
    }

    /// Statements executed so far.
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Relaxed)
    }

    pub fn is_abandoned(&self) -> bool {
        self.cancel.is_cancelled() || self.lease.as_ref().is_some_and(|l| l.is_stale())
    }

    /// Call `decl` with `args`, closing over `globals`.
    ///
    /// Once the run finishes (or its future is dropped) every scope a
    /// script closure captured is emptied, so closures returned to the
    /// caller can no longer see their variables.
    pub async fn run(
        &self,
        decl: Arc<FunctionDecl>,
        globals: Scope,
        args: Vec<Value>,
    ) -> EvalResult<Value> {
        let _release = ReleaseCaptured(self);
        let closure = Closure {
            decl,
            scope: self.capture(&globals),
        };
        self.call_closure(&closure, args).await
    }

    /// Record `scope` as closed over and return a handle to it.
    fn capture(&self, scope: &Scope) -> Scope {
        let mut captured = self.captured.lock();
        if captured.len() == captured.capacity() && captured.len() >= 64 {
            captured.retain(WeakScope::is_live);
        }
        captured.push(scope.downgrade());
        scope.clone()
    }

    fn checkpoint(&self) -> EvalResult<()> {
        if self.is_abandoned() {
            Err(Interrupt::Abandoned)
        } else {
            Ok(())
        }
    }

    async fn tick(&self) -> EvalResult<()> {
        let steps = self.steps.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(max) = self.limits.max_steps {
            if steps > max {
                return Err(Interrupt::BudgetExhausted { steps: max });
            }
        }
        if steps % self.limits.yield_interval.max(1) == 0 {
            tokio::task::yield_now().await;
            self.checkpoint()?;
        }
        Ok(())
    }

    fn enter_call(&self) -> EvalResult<CallDepth<'_>> {
        let depth = self.depth.fetch_add(1, Ordering::Relaxed) + 1;
        let guard = CallDepth(&self.depth);
        if depth > self.limits.max_call_depth {
            return throw(ErrorKind::RangeError, "Maximum call stack size exceeded");
        }
        Ok(guard)
    }

    fn declare(&self, scope: &Scope, name: &str, value: Value, kind: DeclKind) -> EvalResult<()> {
        scope
            .declare(name, value, kind)
            .map_err(|err| scope_error(err, name))
    }

    // ---------------------------------------------------------------
    // Calls
    // ---------------------------------------------------------------

    fn call_closure<'a>(
        &'a self,
        closure: &'a Closure,
        args: Vec<Value>,
    ) -> BoxFuture<'a, EvalResult<Value>> {
        async move {
            let _depth = self.enter_call()?;
            self.tick().await?;

            let decl = &closure.decl;
            let scope = closure.scope.function(decl.body.is_strict());
            for (i, param) in decl.params.iter().enumerate() {
                let value = args.get(i).cloned().unwrap_or(Value::Undefined);
                self.declare(&scope, param, value, DeclKind::Var)?;
            }
            let mut vars = Vec::new();
            collect_var_names(&decl.body.body, &mut vars);
            for name in &vars {
                scope.hoist_var(name);
            }

            match self.exec_block(&decl.body.body, &scope).await? {
                Flow::Return(value) => Ok(value),
                _ => Ok(Value::Undefined),
            }
        }
        .boxed()
    }

    async fn call_host(&self, function: Arc<dyn HostFunction>, args: Vec<Value>) -> EvalResult<Value> {
        self.checkpoint()?;
        let result = function.call(args).await;
        if self.is_abandoned() {
            tracing::debug!(capability = function.name(), "host call returned after abandonment");
            return Err(Interrupt::Abandoned);
        }
        match result {
            Ok(value) => Ok(value),
            Err(HostError::Thrown(value)) => Err(Interrupt::Throw(value)),
            Err(HostError::Refused) => {
                tracing::debug!(capability = function.name(), "host call refused");
                Err(Interrupt::Abandoned)
            }
        }
    }

    fn call_value<'a>(
        &'a self,
        callee: Value,
        args: Vec<Value>,
        name: String,
    ) -> BoxFuture<'a, EvalResult<Value>> {
        async move {
            match callee {
                Value::Function(Callable::Intrinsic(intrinsic)) => {
                    intrinsic.call(&args).map_err(Interrupt::Throw)
                }
                Value::Function(Callable::Host(function)) => self.call_host(function, args).await,
                Value::Function(Callable::Script(closure)) => {
                    self.call_closure(&closure, args).await
                }
                _ => throw(ErrorKind::TypeError, format!("{} is not a function", name)),
            }
        }
        .boxed()
    }

    // ---------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------

    /// Run `stmts` in `scope`, hoisting function declarations first.
    fn exec_block<'a>(
        &'a self,
        stmts: &'a [Stmt],
        scope: &'a Scope,
    ) -> BoxFuture<'a, EvalResult<Flow>> {
        async move {
            for stmt in stmts {
                if let Stmt::Function(decl) = stmt {
                    if let Some(name) = &decl.name {
                        let closure = Closure {
                            decl: decl.clone(),
                            scope: self.capture(scope),
                        };
                        scope.declare_function(
                            name,
                            Value::Function(Callable::Script(Arc::new(closure))),
                        );
                    }
                }
            }
            for stmt in stmts {
                match self.exec_stmt(stmt, scope).await? {
                    Flow::Normal => {}
                    abrupt => return Ok(abrupt),
                }
            }
            Ok(Flow::Normal)
        }
        .boxed()
    }

    fn exec_stmt<'a>(&'a self, stmt: &'a Stmt, scope: &'a Scope) -> BoxFuture<'a, EvalResult<Flow>> {
        async move {
            self.tick().await?;
            match stmt {
                Stmt::Expr(expr) => {
                    self.eval(expr, scope).await?;
                    Ok(Flow::Normal)
                }
                Stmt::Decl { kind, declarators } => {
                    for (name, init) in declarators {
                        match (kind, init) {
                            (DeclKind::Var, None) => scope.hoist_var(name),
                            (DeclKind::Var, Some(expr)) => {
                                let value = self.eval(expr, scope).await?;
                                self.declare(scope, name, value, DeclKind::Var)?;
                            }
                            (kind, init) => {
                                let value = match init {
                                    Some(expr) => self.eval(expr, scope).await?,
                                    None => Value::Undefined,
                                };
                                self.declare(scope, name, value, *kind)?;
                            }
                        }
                    }
                    Ok(Flow::Normal)
                }
                Stmt::Function(_) | Stmt::Empty => Ok(Flow::Normal),
                Stmt::If {
                    test,
                    consequent,
                    alternate,
                } => {
                    if truthy(&self.eval(test, scope).await?) {
                        self.exec_stmt(consequent, scope).await
                    } else if let Some(alternate) = alternate {
                        self.exec_stmt(alternate, scope).await
                    } else {
                        Ok(Flow::Normal)
                    }
                }
                Stmt::While { test, body } => {
                    while truthy(&self.eval(test, scope).await?) {
                        match self.exec_stmt(body, scope).await? {
                            Flow::Break => break,
                            Flow::Return(value) => return Ok(Flow::Return(value)),
                            Flow::Normal | Flow::Continue => {}
                        }
                    }
                    Ok(Flow::Normal)
                }
                Stmt::DoWhile { body, test } => {
                    loop {
                        match self.exec_stmt(body, scope).await? {
                            Flow::Break => break,
                            Flow::Return(value) => return Ok(Flow::Return(value)),
                            Flow::Normal | Flow::Continue => {}
                        }
                        if !truthy(&self.eval(test, scope).await?) {
                            break;
                        }
                    }
                    Ok(Flow::Normal)
                }
                Stmt::For {
                    init,
                    test,
                    update,
                    body,
                } => {
                    let loop_scope = scope.block();
                    if let Some(init) = init {
                        self.exec_stmt(init, &loop_scope).await?;
                    }
                    loop {
                        if let Some(test) = test {
                            if !truthy(&self.eval(test, &loop_scope).await?) {
                                break;
                            }
                        }
                        match self.exec_stmt(body, &loop_scope).await? {
                            Flow::Break => break,
                            Flow::Return(value) => return Ok(Flow::Return(value)),
                            Flow::Normal | Flow::Continue => {}
                        }
                        if let Some(update) = update {
                            self.eval(update, &loop_scope).await?;
                        }
                    }
                    Ok(Flow::Normal)
                }
                Stmt::ForEach {
                    kind,
                    name,
                    iterable,
                    over,
                    body,
                } => {
                    let target = self.eval(iterable, scope).await?;
                    let snapshot = match (over, &target) {
                        (IterationKind::Values, Value::Array(_)) => None,
                        (IterationKind::Values, Value::String(s)) => {
                            Some(s.chars().map(|c| Value::String(c.to_string())).collect())
                        }
                        (IterationKind::Values, other) => {
                            return throw(
                                ErrorKind::TypeError,
                                format!("{} is not iterable", to_string(other)),
                            )
                        }
                        (IterationKind::Keys, other) => Some(enumerable_keys(other)),
                    };

                    let mut index = 0;
                    while let Some(item) = iteration_item(&snapshot, &target, index) {
                        index += 1;
                        let iter_scope = scope.block();
                        match kind {
                            DeclKind::Var => self.declare(scope, name, item, DeclKind::Var)?,
                            other => self.declare(&iter_scope, name, item, *other)?,
                        }
                        match self.exec_stmt(body, &iter_scope).await? {
                            Flow::Break => break,
                            Flow::Return(value) => return Ok(Flow::Return(value)),
                            Flow::Normal | Flow::Continue => {}
                        }
                    }
                    Ok(Flow::Normal)
                }
                Stmt::Block(stmts) => self.exec_block(stmts, &scope.block()).await,
                Stmt::Return(expr) => {
                    let value = match expr {
                        Some(expr) => self.eval(expr, scope).await?,
                        None => Value::Undefined,
                    };
                    Ok(Flow::Return(value))
                }
                Stmt::Throw(expr) => {
                    let value = self.eval(expr, scope).await?;
                    Err(Interrupt::Throw(value))
                }
                Stmt::Try {
                    block,
                    handler,
                    finalizer,
                } => {
                    let outcome = self.exec_block(block, &scope.block()).await;
                    let result = match (outcome, handler) {
                        (Err(Interrupt::Throw(thrown)), Some(handler)) => {
                            let catch_scope = scope.block();
                            if let Some(param) = &handler.param {
                                self.declare(&catch_scope, param, thrown, DeclKind::Let)?;
                            }
                            self.exec_block(&handler.body, &catch_scope).await
                        }
                        (outcome, _) => outcome,
                    };
                    match finalizer {
                        // An abandoned or exhausted run executes no further user code.
                        Some(_) if matches!(result, Err(Interrupt::Abandoned | Interrupt::BudgetExhausted { .. })) => {
                            result
                        }
                        Some(finalizer) => match self.exec_block(finalizer, &scope.block()).await? {
                            Flow::Normal => result,
                            abrupt => Ok(abrupt),
                        },
                        None => result,
                    }
                }
                Stmt::Break => Ok(Flow::Break),
                Stmt::Continue => Ok(Flow::Continue),
            }
        }
        .boxed()
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    fn eval<'a>(&'a self, expr: &'a Expr, scope: &'a Scope) -> BoxFuture<'a, EvalResult<Value>> {
        async move {
            match expr {
                Expr::Number(n) => Ok(Value::Number(*n)),
                Expr::Str(s) => Ok(Value::String(s.clone())),
                Expr::Bool(b) => Ok(Value::Bool(*b)),
                Expr::Null => Ok(Value::Null),
                Expr::Undefined => Ok(Value::Undefined),
                Expr::Ident(name) => match scope.lookup(name) {
                    Some(value) => Ok(value),
                    None => throw(ErrorKind::ReferenceError, format!("{} is not defined", name)),
                },
                Expr::Array(items) => {
                    let values = self.eval_list(items, scope).await?;
                    Ok(Value::array(values))
                }
                Expr::Object(props) => {
                    let mut map = PropertyMap::new();
                    for (key, expr) in props {
                        let value = self.eval(expr, scope).await?;
                        map.set(key.clone(), value);
                    }
                    Ok(Value::object(map))
                }
                Expr::Function(decl) => Ok(Value::Function(Callable::Script(Arc::new(Closure {
                    decl: decl.clone(),
                    scope: self.capture(scope),
                })))),
                Expr::Unary { op, arg } => self.eval_unary(*op, arg, scope).await,
                Expr::Binary { op, left, right } => {
                    let left = self.eval(left, scope).await?;
                    let right = self.eval(right, scope).await?;
                    Ok(apply_binary(*op, &left, &right))
                }
                Expr::Logical { op, left, right } => {
                    let left = self.eval(left, scope).await?;
                    let short_circuit = match op {
                        LogicalOp::And => !truthy(&left),
                        LogicalOp::Or => truthy(&left),
                    };
                    if short_circuit {
                        Ok(left)
                    } else {
                        self.eval(right, scope).await
                    }
                }
                Expr::Conditional {
                    test,
                    consequent,
                    alternate,
                } => {
                    if truthy(&self.eval(test, scope).await?) {
                        self.eval(consequent, scope).await
                    } else {
                        self.eval(alternate, scope).await
                    }
                }
                Expr::Assign { op, target, value } => {
                    self.eval_assign(*op, target, value, scope).await
                }
                Expr::Update { op, prefix, target } => {
                    let place = self.place(target, scope).await?;
                    let old = to_f64(&self.read_place(&place, scope)?);
                    let new = match op {
                        UpdateOp::Increment => old + 1.0,
                        UpdateOp::Decrement => old - 1.0,
                    };
                    self.write_place(&place, Value::Number(new), scope)?;
                    Ok(Value::Number(if *prefix { new } else { old }))
                }
                Expr::Call { callee, args } => self.eval_call(callee, args, scope).await,
                Expr::New { callee, args } => {
                    let constructor = self.eval(callee, scope).await?;
                    let args = self.eval_list(args, scope).await?;
                    match constructor {
                        Value::Function(Callable::Intrinsic(intrinsic))
                            if intrinsic.is_constructor() =>
                        {
                            intrinsic.call(&args).map_err(Interrupt::Throw)
                        }
                        _ => throw(
                            ErrorKind::TypeError,
                            format!("{} is not a constructor", describe_callee(callee)),
                        ),
                    }
                }
                Expr::Member { object, property } => {
                    let object = self.eval(object, scope).await?;
                    get_property(&object, &Value::from(property.as_str())).map_err(Interrupt::Throw)
                }
                Expr::Index { object, index } => {
                    let object = self.eval(object, scope).await?;
                    let index = self.eval(index, scope).await?;
                    get_property(&object, &index).map_err(Interrupt::Throw)
                }
                Expr::Await(arg) => {
                    let value = self.eval(arg, scope).await?;
                    tokio::task::yield_now().await;
                    self.checkpoint()?;
                    Ok(value)
                }
            }
        }
        .boxed()
    }

    async fn eval_list(&self, exprs: &[Expr], scope: &Scope) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            values.push(self.eval(expr, scope).await?);
        }
        Ok(values)
    }

    async fn eval_unary(&self, op: UnaryOp, arg: &Expr, scope: &Scope) -> EvalResult<Value> {
        if let (UnaryOp::TypeOf, Expr::Ident(name)) = (op, arg) {
            let value = scope.lookup(name).unwrap_or(Value::Undefined);
            return Ok(Value::from(type_of(&value)));
        }
        let value = self.eval(arg, scope).await?;
        Ok(match op {
            UnaryOp::Not => Value::Bool(!truthy(&value)),
            UnaryOp::Neg => Value::Number(-to_f64(&value)),
            UnaryOp::Plus => Value::Number(to_f64(&value)),
            UnaryOp::TypeOf => Value::from(type_of(&value)),
        })
    }

    async fn eval_call(&self, callee: &Expr, args: &[Expr], scope: &Scope) -> EvalResult<Value> {
        let name = describe_callee(callee);
        let function = match callee {
            Expr::Member { object, property } => {
                let receiver = self.eval(object, scope).await?;
                if has_builtin_method(&receiver, property) {
                    let args = self.eval_list(args, scope).await?;
                    return call_builtin_method(&receiver, property, &args)
                        .map_err(Interrupt::Throw);
                }
                get_property(&receiver, &Value::from(property.as_str()))
                    .map_err(Interrupt::Throw)?
            }
            other => self.eval(other, scope).await?,
        };
        let args = self.eval_list(args, scope).await?;
        self.call_value(function, args, name).await
    }

    async fn eval_assign(
        &self,
        op: AssignOp,
        target: &Expr,
        value: &Expr,
        scope: &Scope,
    ) -> EvalResult<Value> {
        let place = self.place(target, scope).await?;
        let value = match op.0 {
            None => self.eval(value, scope).await?,
            Some(binary) => {
                let current = self.read_place(&place, scope)?;
                let rhs = self.eval(value, scope).await?;
                apply_binary(binary, &current, &rhs)
            }
        };
        self.write_place(&place, value.clone(), scope)?;
        Ok(value)
    }

    async fn place(&self, target: &Expr, scope: &Scope) -> EvalResult<Place> {
        match target {
            Expr::Ident(name) => Ok(Place::Binding(name.clone())),
            Expr::Member { object, property } => Ok(Place::Property {
                object: self.eval(object, scope).await?,
                key: Value::from(property.as_str()),
            }),
            Expr::Index { object, index } => {
                let object = self.eval(object, scope).await?;
                let key = self.eval(index, scope).await?;
                Ok(Place::Property { object, key })
            }
            _ => throw(ErrorKind::SyntaxError, "Invalid assignment target"),
        }
    }

    fn read_place(&self, place: &Place, scope: &Scope) -> EvalResult<Value> {
        match place {
            Place::Binding(name) => scope
                .lookup(name)
                .ok_or_else(|| scope_error(ScopeError::Undeclared, name)),
            Place::Property { object, key } => get_property(object, key).map_err(Interrupt::Throw),
        }
    }

    fn write_place(&self, place: &Place, value: Value, scope: &Scope) -> EvalResult<()> {
        match place {
            Place::Binding(name) => scope
                .assign(name, value)
                .map_err(|err| scope_error(err, name)),
            Place::Property { object, key } => {
                set_property(object, key, value).map_err(Interrupt::Throw)
            }
        }
    }
}
