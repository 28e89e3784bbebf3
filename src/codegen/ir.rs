//! In-tree IR model
//!
//! A small SSA representation covering exactly what Bolt lowers to: functions
//! with a single entry block, calls, integer arithmetic, loads and string
//! element addresses, plus module globals. `Display` renders a module as LLVM
//! textual IR, which is the `.ll` artifact and the input to the optional LLVM
//! backend.

use crate::types::Type;
use std::fmt;

/// Low-level value type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    Void,
    I1,
    I8,
    I16,
    I32,
    I64,
    Ptr(Box<IrType>),
    Array(Box<IrType>, usize),
}

impl IrType {
    /// Fixed lowering of Bolt types
    pub fn from_type(ty: &Type) -> Self {
        match ty {
            Type::None => IrType::Void,
            Type::Bool => IrType::I1,
            Type::Int | Type::UInt => IrType::I64,
            Type::Int8 | Type::UInt8 => IrType::I8,
            Type::Int16 | Type::UInt16 => IrType::I16,
            Type::Int32 | Type::UInt32 => IrType::I32,
            Type::Int64 | Type::UInt64 => IrType::I64,
            // LLVM has no pointer to void
            Type::Pointer(inner) if **inner == Type::None => IrType::ptr(IrType::I8),
            Type::Pointer(inner) => IrType::ptr(Self::from_type(inner)),
            Type::String => Self::from_type(&Type::pointer(Type::Int8)),
        }
    }

    pub fn ptr(inner: IrType) -> Self {
        IrType::Ptr(Box::new(inner))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, IrType::Void)
    }

    pub fn element(&self) -> Option<&IrType> {
        match self {
            IrType::Ptr(inner) | IrType::Array(inner, _) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::I1 => write!(f, "i1"),
            IrType::I8 => write!(f, "i8"),
            IrType::I16 => write!(f, "i16"),
            IrType::I32 => write!(f, "i32"),
            IrType::I64 => write!(f, "i64"),
            IrType::Ptr(inner) => write!(f, "{}*", inner),
            IrType::Array(elem, len) => write!(f, "[{} x {}]", len, elem),
        }
    }
}

/// SSA temporary, unique within a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(pub u32);

/// Typed operand
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Const { ty: IrType, value: i64 },
    Temp { ty: IrType, id: ValueId },
    Param { ty: IrType, name: String },
    /// Address of a global; `ty` is the pointer type
    Global { ty: IrType, name: String },
}

impl Value {
    pub fn int(ty: IrType, value: i64) -> Self {
        Value::Const { ty, value }
    }

    pub fn bool(value: bool) -> Self {
        Value::Const {
            ty: IrType::I1,
            value: value as i64,
        }
    }

    pub fn ty(&self) -> &IrType {
        match self {
            Value::Const { ty, .. }
            | Value::Temp { ty, .. }
            | Value::Param { ty, .. }
            | Value::Global { ty, .. } => ty,
        }
    }

    /// The operand without its type
    pub fn operand(&self) -> String {
        match self {
            Value::Const {
                ty: IrType::I1,
                value,
            } => {
                let text = if *value != 0 { "true" } else { "false" };
                text.to_string()
            }
            Value::Const { value, .. } => value.to_string(),
            Value::Temp { id, .. } => format!("%t.{}", id.0),
            Value::Param { name, .. } => local_name(name),
            Value::Global { name, .. } => global_name(name),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ty(), self.operand())
    }
}

/// Integer arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SRem,
    URem,
}

impl BinaryOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::UDiv => "udiv",
            BinaryOp::SRem => "srem",
            BinaryOp::URem => "urem",
        }
    }
}

/// Instruction operation
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Call {
        callee: String,
        return_type: IrType,
        args: Vec<Value>,
    },
    Binary {
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
    },
    Load {
        ty: IrType,
        ptr: Value,
    },
    /// Address of element zero of an array global
    ElementAddress {
        array_ty: IrType,
        ptr: Value,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrInstr {
    pub result: Option<ValueId>,
    pub op: Op,
}

/// Block terminator
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Return(Option<Value>),
    Unreachable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrBlock {
    pub label: String,
    pub instructions: Vec<IrInstr>,
    pub terminator: Option<Terminator>,
}

impl IrBlock {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            instructions: Vec::new(),
            terminator: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrParam {
    pub name: String,
    pub ty: IrType,
}

/// A function; without blocks it is a declaration
#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    pub name: String,
    pub return_type: IrType,
    pub params: Vec<IrParam>,
    pub blocks: Vec<IrBlock>,
    next_value: u32,
}

impl IrFunction {
    pub fn new(name: impl Into<String>, return_type: IrType, params: Vec<IrParam>) -> Self {
        Self {
            name: name.into(),
            return_type,
            params,
            blocks: Vec::new(),
            next_value: 0,
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn param_types(&self) -> impl Iterator<Item = &IrType> {
        self.params.iter().map(|p| &p.ty)
    }

    pub fn param_value(&self, index: usize) -> Option<Value> {
        self.params.get(index).map(|p| Value::Param {
            ty: p.ty.clone(),
            name: p.name.clone(),
        })
    }

    /// Open the entry block
    pub fn append_entry_block(&mut self) {
        self.blocks.push(IrBlock::new("entry"));
    }

    fn current_block(&mut self) -> Option<&mut IrBlock> {
        self.blocks.last_mut()
    }

    /// Append an instruction producing a value of `ty` to the current block.
    /// Returns `None` for void results or when no block is open.
    pub fn push(&mut self, op: Op, ty: IrType) -> Option<Value> {
        let result = if ty.is_void() {
            None
        } else {
            let id = ValueId(self.next_value);
            self.next_value += 1;
            Some(id)
        };
        self.current_block()?.instructions.push(IrInstr { result, op });
        result.map(|id| Value::Temp { ty, id })
    }

    /// Set the terminator of the current block unless one is already set
    pub fn terminate(&mut self, terminator: Terminator) {
        if let Some(block) = self.current_block() {
            if block.terminator.is_none() {
                block.terminator = Some(terminator);
            }
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.blocks.last().is_some_and(|b| b.terminator.is_some())
    }

    /// Close a block that fell off its end
    pub fn seal(&mut self) {
        if self.is_declaration() || self.is_terminated() {
            return;
        }
        let terminator = if self.return_type.is_void() {
            Terminator::Return(None)
        } else {
            Terminator::Unreachable
        };
        self.terminate(terminator);
    }
}

/// Linkage and initializer of a global
#[derive(Debug, Clone, PartialEq)]
pub enum GlobalInit {
    /// Anonymous string buffer, private to the module
    PrivateBytes(Vec<u8>),
    Bytes(Vec<u8>),
    Int(i64),
    /// Defined in another module
    External,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrGlobal {
    pub name: String,
    /// Type of the stored value, not of its address
    pub ty: IrType,
    pub init: GlobalInit,
}

impl IrGlobal {
    /// The global's address as an operand
    pub fn address(&self) -> Value {
        Value::Global {
            ty: IrType::ptr(self.ty.clone()),
            name: self.name.clone(),
        }
    }

    /// Whether uses read element zero's address rather than loading
    pub fn is_array(&self) -> bool {
        matches!(self.ty, IrType::Array(..))
    }
}

/// Translation unit
#[derive(Debug, Clone, PartialEq)]
pub struct IrModule {
    pub name: String,
    pub globals: Vec<IrGlobal>,
    pub functions: Vec<IrFunction>,
    next_label: u32,
}

impl IrModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            globals: Vec::new(),
            functions: Vec::new(),
            next_label: 0,
        }
    }

    pub fn find_function(&self, name: &str) -> Option<&IrFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn find_function_mut(&mut self, name: &str) -> Option<&mut IrFunction> {
        self.functions.iter_mut().find(|f| f.name == name)
    }

    pub fn add_function(&mut self, function: IrFunction) -> &mut IrFunction {
        self.functions.push(function);
        let last = self.functions.len() - 1;
        &mut self.functions[last]
    }

    pub fn find_global(&self, name: &str) -> Option<&IrGlobal> {
        self.globals.iter().find(|g| g.name == name)
    }

    /// Add a global, completing an `external` one of the same name in place
    pub fn add_global(&mut self, global: IrGlobal) -> Value {
        let address = global.address();
        match self
            .globals
            .iter_mut()
            .find(|g| g.name == global.name && g.init == GlobalInit::External)
        {
            Some(external) => *external = global,
            None => self.globals.push(global),
        }
        address
    }

    /// Add a NUL-terminated byte array global
    pub fn add_string(&mut self, name: impl Into<String>, text: &str) -> Value {
        let bytes = c_string(text);
        self.add_global(IrGlobal {
            name: name.into(),
            ty: IrType::Array(Box::new(IrType::I8), bytes.len()),
            init: GlobalInit::Bytes(bytes),
        })
    }

    /// Add an anonymous private string buffer labelled `.L0`, `.L1`, ...
    ///
    /// The leading dot keeps labels apart from every Bolt identifier.
    pub fn add_string_literal(&mut self, text: &str) -> Value {
        let name = format!(".L{}", self.next_label);
        self.next_label += 1;
        let bytes = c_string(text);
        self.add_global(IrGlobal {
            name,
            ty: IrType::Array(Box::new(IrType::I8), bytes.len()),
            init: GlobalInit::PrivateBytes(bytes),
        })
    }

    /// Functions with a body
    pub fn defined_functions(&self) -> impl Iterator<Item = &IrFunction> {
        self.functions.iter().filter(|f| !f.is_declaration())
    }
}

fn c_string(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    bytes
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | '-'))
}

fn quoted(sigil: char, name: &str) -> String {
    if is_plain_name(name) {
        format!("{}{}", sigil, name)
    } else {
        format!("{}\"{}\"", sigil, escape_bytes(name.as_bytes()))
    }
}

pub fn global_name(name: &str) -> String {
    quoted('@', name)
}

pub fn local_name(name: &str) -> String {
    quoted('%', name)
}

/// Printable ASCII except `"` and `\` verbatim, everything else as `\XX`
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if (0x20..0x7f).contains(&b) && b != b'"' && b != b'\\' {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\{:02X}", b));
        }
    }
    out
}

// ==================== PRINTING ====================

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Value]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

impl fmt::Display for IrInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(id) = self.result {
            write!(f, "%t.{} = ", id.0)?;
        }
        match &self.op {
            Op::Call {
                callee,
                return_type,
                args,
            } => {
                write!(f, "call {} {}(", return_type, global_name(callee))?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Op::Binary { op, lhs, rhs } => {
                write!(f, "{} {}, {}", op.mnemonic(), lhs, rhs.operand())
            }
            Op::Load { ty, ptr } => write!(f, "load {}, {}", ty, ptr),
            Op::ElementAddress { array_ty, ptr } => write!(
                f,
                "getelementptr inbounds {}, {}, i64 0, i64 0",
                array_ty, ptr
            ),
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Return(Some(value)) => write!(f, "ret {}", value),
            Terminator::Return(None) => write!(f, "ret void"),
            Terminator::Unreachable => write!(f, "unreachable"),
        }
    }
}

impl fmt::Display for IrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.label)?;
        for instr in &self.instructions {
            writeln!(f, "  {}", instr)?;
        }
        match &self.terminator {
            Some(term) => writeln!(f, "  {}", term),
            None => writeln!(f, "  unreachable"),
        }
    }
}

impl fmt::Display for IrFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_declaration() {
            write!(f, "declare {} {}(", self.return_type, global_name(&self.name))?;
            for (i, ty) in self.param_types().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", ty)?;
            }
            return writeln!(f, ")");
        }

        write!(f, "define {} {}(", self.return_type, global_name(&self.name))?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", param.ty, local_name(&param.name))?;
        }
        writeln!(f, ") {{")?;
        for block in &self.blocks {
            write!(f, "{}", block)?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for IrGlobal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = global_name(&self.name);
        match &self.init {
            GlobalInit::PrivateBytes(bytes) => write!(
                f,
                "{} = private unnamed_addr constant {} c\"{}\", align 1",
                name,
                self.ty,
                escape_bytes(bytes)
            ),
            GlobalInit::Bytes(bytes) => write!(
                f,
                "{} = constant {} c\"{}\", align 1",
                name,
                self.ty,
                escape_bytes(bytes)
            ),
            GlobalInit::Int(value) => {
                let init = Value::int(self.ty.clone(), *value);
                write!(f, "{} = constant {}", name, init)
            }
            GlobalInit::External => write!(f, "{} = external global {}", name, self.ty),
        }
    }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        writeln!(f, "source_filename = \"{}\"", escape_bytes(self.name.as_bytes()))?;

        if !self.globals.is_empty() {
            writeln!(f)?;
            for global in &self.globals {
                writeln!(f, "{}", global)?;
            }
        }

        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{}", function)?;
        }
        Ok(())
    }
}
