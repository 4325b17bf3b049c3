//! Console-backed operator decisions.

use std::io::{self, BufRead, Write};
use taskdesk_core::extract::TicketCode;
use taskdesk_core::model::Ticket;
use taskdesk_triage::engine::{Decider, Proposal};

/// Shows proposals on `output` and reads answers line by line from `input`.
///
/// End of input reads as a blank answer, which declines the confirmation and
/// skips the ticket.
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> io::Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    fn show(&mut self, proposal: &Proposal<'_>) -> io::Result<()> {
        let ticket = proposal.ticket;
        writeln!(self.output, "Task: {}", ticket.title())?;
        writeln!(
            self.output,
            "Project: {} | Priority: {} | Current: {}",
            proposal.project.name,
            ticket.priority_label(),
            ticket.assignee_name()
        )?;
        if !proposal.pool.unresolved.is_empty() {
            writeln!(
                self.output,
                "Preferred devs not found: {}",
                proposal.pool.unresolved.join(", ")
            )?;
        }
        writeln!(self.output, "Candidates (most project tasks first):")?;
        for (i, c) in proposal.candidates.iter().enumerate() {
            let recent = if c.recent { " recent" } else { "" };
            writeln!(
                self.output,
                "{}. {} | {} | open tasks in project: {}{recent}",
                i + 1,
                c.name,
                c.role,
                c.open_tickets
            )?;
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> Decider for ConsolePrompt<R, W> {
    fn pick_ticket(&mut self, _code: &TicketCode, matches: &[Ticket]) -> io::Result<String> {
        writeln!(self.output, "Multiple tasks found:")?;
        for (i, t) in matches.iter().enumerate() {
            writeln!(
                self.output,
                "{}. {} | {} | Project: {} | Assigned: {}",
                i + 1,
                t.id,
                t.title(),
                t.project_name(),
                t.assignee_name()
            )?;
        }
        self.ask("Select task number: ")
    }

    fn confirm(&mut self, proposal: &Proposal<'_>) -> io::Result<bool> {
        self.show(proposal)?;
        let answer = self.ask(&format!("Assign to {}? [y/N] ", proposal.top.name))?;
        Ok(answer.eq_ignore_ascii_case("y"))
    }

    fn pick_candidate(&mut self, _proposal: &Proposal<'_>) -> io::Result<String> {
        self.ask("Enter candidate number to assign (or blank to skip): ")
    }
}
