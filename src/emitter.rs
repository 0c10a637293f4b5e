use crate::ast::ProcedureDecl;

/// Word size of the target machine in bytes.
const WORD: i32 = 4;

/// One code-generation session: the output line buffer, the label-id
/// counter, and the stack-layout context of the procedure currently being
/// compiled. Never shared across compilations.
pub struct Emitter<'p> {
    lines: Vec<String>,
    label_id: u32,
    current_proc: Option<&'p ProcedureDecl>,
    excess_stack_height: i32,
}

impl<'p> Emitter<'p> {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            label_id: 1,
            current_proc: None,
            excess_stack_height: 0,
        }
    }

    /// Appends one line; non-label lines are indented with a tab.
    pub fn emit(&mut self, code: &str) {
        if code.ends_with(':') {
            self.lines.push(code.to_string());
        } else {
            self.lines.push(format!("\t{code}"));
        }
    }

    /// Pushes the value of `reg` onto the stack.
    pub fn emit_push(&mut self, reg: &str) {
        self.emit("subu $sp $sp 4");
        self.emit(&format!("sw {reg} ($sp)"));
        self.excess_stack_height += WORD;
    }

    /// Pops the top of the stack into `reg`.
    pub fn emit_pop(&mut self, reg: &str) {
        self.emit(&format!("lw {reg} ($sp)"));
        self.emit("addu $sp $sp 4");
        self.excess_stack_height -= WORD;
    }

    /// Increments the label counter and returns the new value. The counter
    /// starts at 1, so the first issued id is 2.
    pub fn next_label_id(&mut self) -> u32 {
        self.label_id += 1;
        self.label_id
    }

    /// Enters a procedure's stack-layout context and zeroes the tracked
    /// excess stack height. The return slot must already be pushed.
    pub fn set_procedure_context(&mut self, proc: &'p ProcedureDecl) {
        self.current_proc = Some(proc);
        self.excess_stack_height = 0;
    }

    pub fn clear_procedure_context(&mut self) {
        self.current_proc = None;
    }

    /// Stack offset for a name in the current procedure's frame, or `None`
    /// when the name is a global (or no procedure is being compiled).
    ///
    /// Frame layout from the stack pointer outward: locals in declaration
    /// order, the procedure's return slot, parameters in reverse declaration
    /// order, the caller's return address. Parameter offsets also absorb
    /// whatever scratch the expression mid-compilation has pushed.
    pub fn frame_offset(&self, name: &str) -> Option<i32> {
        let proc = self.current_proc?;
        if name == proc.name {
            return Some(0);
        }
        if let Some(index) = proc.locals.iter().position(|local| local == name) {
            return Some(WORD * index as i32);
        }
        let index = proc.params.iter().position(|param| param == name)?;
        Some(WORD * (proc.params.len() as i32 - index as i32 - 1) + self.excess_stack_height + WORD)
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl Default for Emitter<'_> {
    fn default() -> Self {
        Self::new()
    }
}
