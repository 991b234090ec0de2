//! Challenge-text lock
//!
//! When a challenge text is set, privileged options are locked until the user
//! re-types it exactly. The lock state is decided once per session (page
//! load or import) and checked through `authorize` before every privileged
//! operation.

bitflags::bitflags! {
    /// Operations that require an unlocked session.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Privilege: u8 {
        /// Remove a site from the block list
        const REMOVE_SITE = 1 << 0;
        /// Change the redirect target
        const SAVE_REDIRECT = 1 << 1;
        /// Change or clear the challenge text
        const SET_CHALLENGE = 1 << 2;
    }
}

/// Whether privileged operations are currently permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Unlocked,
}

/// Successful outcome of an unlock attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unlock {
    /// The attempt matched and the session is now unlocked
    Unlocked,
    /// The session was already unlocked; the attempt was not checked
    AlreadyUnlocked,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    #[error("No challenge text is set")]
    NoChallenge,
    #[error("Incorrect challenge text")]
    IncorrectChallenge,
    #[error("Options are locked: {0:?} requires the challenge text")]
    Locked(Privilege),
}

/// Lock state of one options session.
#[derive(Debug, Clone)]
pub struct OptionsSession {
    challenge: String,
    state: LockState,
}

impl OptionsSession {
    /// Start a session. Locked iff a challenge text is set.
    pub fn new(challenge: impl Into<String>) -> Self {
        let challenge = challenge.into();
        let state = initial_state(&challenge);
        Self { challenge, state }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == LockState::Unlocked
    }

    pub fn has_challenge(&self) -> bool {
        !self.challenge.is_empty()
    }

    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    /// Compare `attempt` with the challenge text.
    pub fn unlock(&mut self, attempt: &str) -> Result<Unlock, LockError> {
        if !self.has_challenge() {
            return Err(LockError::NoChallenge);
        }
        if self.is_unlocked() {
            return Ok(Unlock::AlreadyUnlocked);
        }
        if attempt != self.challenge {
            log::debug!("challenge attempt rejected");
            return Err(LockError::IncorrectChallenge);
        }

        self.state = LockState::Unlocked;
        log::info!("options unlocked");
        Ok(Unlock::Unlocked)
    }

    /// Operations permitted in the current state.
    pub fn permitted(&self) -> Privilege {
        match self.state {
            LockState::Unlocked => Privilege::all(),
            LockState::Locked => Privilege::empty(),
        }
    }

    pub fn authorize(&self, privilege: Privilege) -> Result<(), LockError> {
        if self.permitted().contains(privilege) {
            Ok(())
        } else {
            Err(LockError::Locked(privilege))
        }
    }

    /// Replace the challenge text. The session stays unlocked.
    pub fn set_challenge(&mut self, text: impl Into<String>) -> Result<(), LockError> {
        self.authorize(Privilege::SET_CHALLENGE)?;
        self.challenge = text.into();
        Ok(())
    }

    /// Restart the session from a freshly imported challenge text.
    pub fn reset(&mut self, challenge: impl Into<String>) {
        self.challenge = challenge.into();
        self.state = initial_state(&self.challenge);
    }
}

fn initial_state(challenge: &str) -> LockState {
    if challenge.is_empty() {
        LockState::Unlocked
    } else {
        LockState::Locked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert_eq!(OptionsSession::new("").state(), LockState::Unlocked);
        assert_eq!(OptionsSession::new("secret").state(), LockState::Locked);
    }

    #[test]
    fn test_unlock_outcomes() {
        let mut open = OptionsSession::new("");
        assert_eq!(open.unlock("anything"), Err(LockError::NoChallenge));

        let mut session = OptionsSession::new("I will not procrastinate");
        assert_eq!(session.unlock("i will not procrastinate"), Err(LockError::IncorrectChallenge));
        assert_eq!(session.state(), LockState::Locked);

        assert_eq!(session.unlock("I will not procrastinate"), Ok(Unlock::Unlocked));
        assert!(session.is_unlocked());
        assert_eq!(session.unlock("wrong"), Ok(Unlock::AlreadyUnlocked));
    }

    #[test]
    fn test_authorize() {
        let mut session = OptionsSession::new("secret");
        assert_eq!(session.permitted(), Privilege::empty());
        for privilege in [Privilege::REMOVE_SITE, Privilege::SAVE_REDIRECT, Privilege::SET_CHALLENGE] {
            assert_eq!(session.authorize(privilege), Err(LockError::Locked(privilege)));
        }

        session.unlock("secret").unwrap();
        assert_eq!(session.permitted(), Privilege::all());
        assert!(session.permitted().contains(Privilege::REMOVE_SITE | Privilege::SAVE_REDIRECT | Privilege::SET_CHALLENGE));
        assert!(session.authorize(Privilege::REMOVE_SITE | Privilege::SAVE_REDIRECT).is_ok());
    }

    #[test]
    fn test_set_challenge() {
        let mut session = OptionsSession::new("old");
        assert_eq!(session.set_challenge("new"), Err(LockError::Locked(Privilege::SET_CHALLENGE)));

        session.unlock("old").unwrap();
        session.set_challenge("new").unwrap();
        assert_eq!(session.challenge(), "new");
        assert!(session.is_unlocked());
    }

    #[test]
    fn test_reset_relocks() {
        let mut session = OptionsSession::new("");
        session.reset("imported");
        assert_eq!(session.state(), LockState::Locked);
        session.reset("");
        assert_eq!(session.state(), LockState::Unlocked);
    }
}
