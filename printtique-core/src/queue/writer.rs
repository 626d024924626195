/// Any type which can sink commands.
pub trait CommandWrite<Command> {
    /// Inserts a command.
    fn write(&mut self, command: Command);
}
impl<Write, Command> CommandWrite<Command> for &mut Write
where
    Write: CommandWrite<Command>,
{
    fn write(&mut self, command: Command) {
        (**self).write(command);
    }
}
pub struct DesignQueueWriter<'a> {
    pub(super) lock: parking_lot::RwLockWriteGuard<'a, super::DesignQueueInner>,
    // Optimize for exactly one command (the most common case)
    pub(super) commands: smallvec::SmallVec<[crate::commands::Command; 1]>,
}
// Leak-safe in a weird way: if this is never dropped the state no longer matches the tree, but the
// lock is then held forever so nobody can observe it.
impl Drop for DesignQueueWriter<'_> {
    fn drop(&mut self) {
        use crate::commands;
        if self.commands.is_empty() {
            return;
        }

        // Always write exactly one command, bundling into a scope if there's more.
        // If exiting by panic, write as a panic scope (even if the scope is just one command long)
        let command = if std::thread::panicking() {
            commands::Command::Meta(commands::MetaCommand::Scope(
                commands::ScopeType::WritePanic,
                std::mem::take(&mut self.commands).into_boxed_slice(),
            ))
        } else if self.commands.len() == 1 {
            // Len checked above.
            let Some(command) = self.commands.pop() else {
                return;
            };
            command
        } else {
            commands::Command::Meta(commands::MetaCommand::Scope(
                commands::ScopeType::Atoms,
                std::mem::take(&mut self.commands).into_boxed_slice(),
            ))
        };

        let present = self.lock.present;

        log::trace!("Writing new command: {:#?}", command);

        // Write as last child, as that corresponds to "latest change", and update cursor.
        let new = self
            .lock
            .command_tree
            .get_mut(present)
            // A missing "present" node is a logic error. Neglecting to write the command is just as bad,
            // as then the document and history would be mismatched.
            .expect("Present node not found in the command tree.")
            .append(command)
            .node_id();
        self.lock.present = new;
    }
}
impl DesignQueueWriter<'_> {
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.commands.is_empty()
    }
    /// Tracked access to the document.
    pub fn design(
        &'_ mut self,
    ) -> crate::state::writer::DesignWriter<
        '_,
        &mut smallvec::SmallVec<[crate::commands::Command; 1]>,
    > {
        crate::state::writer::DesignWriter::new(&mut self.commands, &mut self.lock.document)
    }
    /// Record that the design was saved to `path`. Only recorded if something changed since the
    /// last save.
    pub fn saved(&mut self, path: std::path::PathBuf) {
        let present = self.lock.present;
        let already = self
            .lock
            .command_tree
            .get(present)
            .and_then(|node| node.data().meta().cloned());
        if let Some(crate::commands::MetaCommand::Save(previous)) = already {
            if previous == path {
                return;
            }
        }
        self.commands
            .push(crate::commands::MetaCommand::Save(path).into());
    }
}

// Any subcommand that can be wrapped in Command can be written into any
// smallvec of Command.
impl<Subcommand, Array> CommandWrite<Subcommand> for smallvec::SmallVec<Array>
where
    Subcommand: Into<crate::commands::Command>,
    Array: smallvec::Array<Item = crate::commands::Command>,
{
    fn write(&mut self, command: Subcommand) {
        self.push(command.into());
    }
}
