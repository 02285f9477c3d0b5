use crate::ir::{Block, BlockRef, InstKind, InstRef, Program};
use core::fmt::{self, Display, Write as _};
use std::collections::HashMap;

impl Program {
    /// Returns the deterministic pretty-printed rendering of the program.
    ///
    /// Blocks print in source order with their labels, entry, caller, and
    /// return sets, the under-frame access summary, the instructions, the
    /// pop and push summaries, and the terminator. Value names count up
    /// per rendering, so numbering is stable within one dump; the output
    /// is not a persisted format.
    pub fn display(&self) -> DisplayProgram<'_> {
        DisplayProgram { program: self }
    }
}

/// Displays a [`Program`]; see [`Program::display`].
#[derive(Debug)]
pub struct DisplayProgram<'a> {
    program: &'a Program,
}

impl Display for DisplayProgram<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut printer = Printer {
            program: self.program,
            names: HashMap::new(),
            next_name: 0,
        };
        printer.write_program(f)
    }
}

struct Printer<'a> {
    program: &'a Program,
    names: HashMap<InstRef, usize>,
    next_name: usize,
}

impl Printer<'_> {
    fn write_program(&mut self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, block) in self.program.block_order().iter().enumerate() {
            if index > 0 {
                f.write_char('\n')?;
            }
            self.write_block(f, *block)?;
        }
        Ok(())
    }

    fn write_block(&mut self, f: &mut fmt::Formatter<'_>, block: BlockRef) -> fmt::Result {
        let program = self.program;
        let block_data = program.block(block);
        if block_data.labels().is_empty() {
            writeln!(f, "block_{}:", block_data.id())?;
        } else {
            for label in block_data.labels() {
                writeln!(f, "{label}:")?;
            }
        }
        writeln!(f, "    entries: {}", preds(program, block_data.entries()))?;
        writeln!(f, "    callers: {}", preds(program, block_data.callers()))?;
        if !block_data.returns().is_empty() {
            let returns: Vec<String> = block_data
                .returns()
                .iter()
                .map(|ret| program.block(*ret).display_name())
                .collect();
            writeln!(f, "    returns: {}", returns.join(" "))?;
        }
        self.write_access_summary(f, block_data)?;
        for inst in block_data.body() {
            let line = self.inst_line(*inst);
            writeln!(f, "    {line}")?;
        }
        if block_data.frame().pops() > 0 {
            writeln!(f, "    pop {}", block_data.frame().pops())?;
        }
        if !block_data.frame().is_empty() {
            let values: Vec<String> = block_data
                .frame()
                .values()
                .iter()
                .map(|value| self.value_name(*value))
                .collect();
            writeln!(f, "    push [{}]", values.join(" "))?;
        }
        match block_data.terminator() {
            Some(term) => {
                let line = self.inst_line(term);
                writeln!(f, "    {line}")
            }
            None => writeln!(f, "    <unterminated>"),
        }
    }

    fn write_access_summary(&mut self, f: &mut fmt::Formatter<'_>, block: &Block) -> fmt::Result {
        let frame = block.frame();
        if frame.accesses() == 0 {
            return Ok(());
        }
        write!(f, "    access {}", frame.accesses())?;
        let placeholders: Vec<String> = frame
            .under()
            .iter()
            .flatten()
            .map(|placeholder| self.value_name(*placeholder))
            .collect();
        if !placeholders.is_empty() {
            write!(f, " [{}]", placeholders.join(" "))?;
        }
        f.write_char('\n')
    }

    /// Renders one instruction line, without indentation.
    fn inst_line(&mut self, inst: InstRef) -> String {
        let mut line = String::new();
        if self.program.kind(inst).is_value() {
            let name = self.value_name(inst);
            let _ = write!(line, "{name} = ");
        }
        let program = self.program;
        let block_name = |block: BlockRef| program.block(block).display_name();
        match self.program.kind(inst).clone() {
            InstKind::IntConst(value) => {
                let _ = write!(line, "const {value}");
            }
            InstKind::StringConst(value) => {
                let _ = write!(line, "const {value:?}");
            }
            InstKind::Binary { op, args } => {
                let lhs = self.value_name(args[0]);
                let rhs = self.value_name(args[1]);
                let _ = write!(line, "{op} {lhs} {rhs}");
            }
            InstKind::Unary { op, arg } => {
                let value = self.value_name(arg[0]);
                let _ = write!(line, "{op} {value}");
            }
            InstKind::LoadStack { depth } => {
                let _ = write!(line, "loadstack {depth}");
            }
            InstKind::LoadHeap { addr } => {
                let addr = self.value_name(addr[0]);
                let _ = write!(line, "loadheap {addr}");
            }
            InstKind::Read { op } => {
                let _ = write!(line, "{op}");
            }
            InstKind::Phi { args } => {
                let _ = write!(line, "phi");
                for arg in args {
                    let value = self.value_name(arg.value);
                    let _ = write!(line, " [{value} {}]", block_name(arg.pred));
                }
            }
            InstKind::StoreHeap { args } => {
                let addr = self.value_name(args[0]);
                let value = self.value_name(args[1]);
                let _ = write!(line, "storeheap {addr} {value}");
            }
            InstKind::StoreStack { depth, value } => {
                let value = self.value_name(value[0]);
                let _ = write!(line, "storestack {depth} {value}");
            }
            InstKind::AccessStack { size } => {
                let _ = write!(line, "accessstack {size}");
            }
            InstKind::OffsetStack { delta } => {
                let _ = write!(line, "offsetstack {delta}");
            }
            InstKind::Print { op, value } => {
                let value = self.value_name(value[0]);
                let _ = write!(line, "{op} {value}");
            }
            InstKind::Flush => line.push_str("flush"),
            InstKind::Call { callee, next } => {
                let _ = write!(line, "call {} {}", block_name(callee), block_name(next));
            }
            InstKind::Jmp { op, dest } => {
                let _ = write!(line, "{op} {}", block_name(dest));
            }
            InstKind::JmpCond {
                op,
                cond,
                then_dest,
                else_dest,
            } => {
                let cond = self.value_name(cond[0]);
                let _ = write!(
                    line,
                    "{op} {cond} {} {}",
                    block_name(then_dest),
                    block_name(else_dest)
                );
            }
            InstKind::Ret => line.push_str("ret"),
            InstKind::Exit => line.push_str("exit"),
        }
        line
    }

    /// Renders a value operand: constants inline, everything else by its
    /// per-dump `%N` name.
    fn value_name(&mut self, inst: InstRef) -> String {
        match self.program.kind(inst) {
            InstKind::IntConst(value) => value.to_string(),
            InstKind::StringConst(value) => format!("{value:?}"),
            _ => {
                let next = &mut self.next_name;
                let id = *self.names.entry(inst).or_insert_with(|| {
                    let id = *next;
                    *next += 1;
                    id
                });
                format!("%{id}")
            }
        }
    }
}

fn preds(program: &Program, list: &[Option<BlockRef>]) -> String {
    if list.is_empty() {
        return "-".to_string();
    }
    let names: Vec<String> = list
        .iter()
        .map(|pred| match pred {
            Some(pred) => program.block(*pred).display_name(),
            None => "-".to_string(),
        })
        .collect();
    names.join(" ")
}
