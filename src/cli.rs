//! Shared front end of the `mailprobe` and `test-connections` binaries.

use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::config::ProbeOptions;
use crate::mailbox::Mailbox;
use crate::outbox::Outbox;
use crate::result::ConnectionTestResult;
use crate::store::RecordStore;
use crate::tester::{MailboxConnectionTester, OutboxConnectionTester};
use crate::transport::Connector;

pub const NOTHING_SELECTED: &str = "Please specify --mailbox, --outbox, or --all";

#[derive(Debug, Parser)]
#[command(version, about = "Test connections for Mailboxes and Outboxes")]
pub struct Args {
    /// Test the mailbox with this ID
    #[arg(long, value_name = "ID")]
    pub mailbox: Option<u64>,

    /// Test the outbox with this ID
    #[arg(long, value_name = "ID")]
    pub outbox: Option<u64>,

    /// Test all mailboxes, then all outboxes
    #[arg(long)]
    pub all: bool,

    /// Records and settings file
    #[arg(long, short, env = "MAILPROBE_CONFIG", default_value = "mailprobe.toml")]
    pub config: PathBuf,
}

/// What to test. A mailbox ID wins over an outbox ID, which wins over `--all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Mailbox(u64),
    Outbox(u64),
    All,
    Nothing,
}

impl Args {
    pub fn selection(&self) -> Selection {
        match (self.mailbox, self.outbox, self.all) {
            (Some(id), _, _) => Selection::Mailbox(id),
            (None, Some(id), _) => Selection::Outbox(id),
            (None, None, true) => Selection::All,
            (None, None, false) => Selection::Nothing,
        }
    }
}

/// Output layout of the two binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStyle {
    /// `  SUCCESS: <msg>` / `  FAILED: <msg>`
    Command,
    /// `  Status: ...`, `  Message: ...` and a blank line
    Script,
}

/// Runs the selected tests one after another and writes the report.
pub struct Runner<'a, S: ?Sized, C> {
    store: &'a S,
    mailboxes: MailboxConnectionTester<C>,
    outboxes: OutboxConnectionTester<C>,
    style: ReportStyle,
}

impl<'a, S, C> Runner<'a, S, C>
where
    S: RecordStore + ?Sized,
    C: Connector + Clone,
{
    pub fn new(store: &'a S, connector: C, options: ProbeOptions, style: ReportStyle) -> Self {
        Self {
            store,
            mailboxes: MailboxConnectionTester::new(connector.clone(), options.clone()),
            outboxes: OutboxConnectionTester::new(connector, options),
            style,
        }
    }

    pub async fn run<W: Write>(&self, selection: Selection, out: &mut W) -> io::Result<()> {
        match selection {
            Selection::Mailbox(id) => match self.store.mailbox(id) {
                Some(mailbox) => self.mailbox(&mailbox, out).await,
                None => writeln!(out, "Mailbox with ID {id} does not exist."),
            },
            Selection::Outbox(id) => match self.store.outbox(id) {
                Some(outbox) => self.outbox(&outbox, out).await,
                None => writeln!(out, "Outbox with ID {id} does not exist."),
            },
            Selection::All => self.all(out).await,
            Selection::Nothing => writeln!(out, "{NOTHING_SELECTED}"),
        }
    }

    async fn all<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let mailboxes = self.store.mailboxes();
        if mailboxes.is_empty() {
            writeln!(out, "No mailboxes found.")?;
        } else {
            writeln!(out, "Testing all mailboxes:")?;
            for mailbox in &mailboxes {
                self.mailbox(mailbox, out).await?;
            }
        }

        let outboxes = self.store.outboxes();
        if outboxes.is_empty() {
            writeln!(out, "No outboxes found.")?;
        } else {
            if self.style == ReportStyle::Script {
                writeln!(out)?;
            }
            writeln!(out, "Testing all outboxes:")?;
            for outbox in &outboxes {
                self.outbox(outbox, out).await?;
            }
        }
        Ok(())
    }

    async fn mailbox<W: Write>(&self, mailbox: &Mailbox, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "Testing connection for Mailbox: {} (ID: {})",
            mailbox.name, mailbox.id
        )?;
        let result = self.mailboxes.test(mailbox).await;
        self.report(&result, out)
    }

    async fn outbox<W: Write>(&self, outbox: &Outbox, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "Testing connection for Outbox: {} (ID: {})",
            outbox.name, outbox.id
        )?;
        let result = self.outboxes.test(outbox).await;
        self.report(&result, out)
    }

    fn report<W: Write>(&self, result: &ConnectionTestResult, out: &mut W) -> io::Result<()> {
        match self.style {
            ReportStyle::Command => writeln!(out, "  {result}"),
            ReportStyle::Script => {
                let status = if result.success() { "SUCCESS" } else { "FAILED" };
                writeln!(out, "  Status: {status}")?;
                writeln!(out, "  Message: {}", result.message())?;
                writeln!(out)
            }
        }
    }
}
