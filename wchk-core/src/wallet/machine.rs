//! Pure session state machine.
//!
//! Connectivity (accounts exposed) and network match (active chain equals
//! the required chain) are independent axes. The machine keeps them apart
//! and only ever publishes an address or balance while connected.

use alloy_primitives::U256;
use wchk_sdk::objects::{ChainId, WalletSession, WalletSnapshot, WalletState};

/// Everything that can change the session.
///
/// The manager turns provider replies and provider events into inputs; the
/// machine never performs I/O itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    /// `connect()` was requested while disconnected.
    ConnectRequested,
    /// Accounts and active chain were read successfully.
    Connected {
        accounts: Vec<String>,
        chain_id: ChainId,
    },
    /// Account access or chain lookup failed during connect or
    /// re-evaluation.
    ConnectFailed,
    AccountsChanged(Vec<String>),
    ChainChanged(ChainId),
    /// The deployment's required chain was reconfigured.
    RequiredChainChanged(ChainId),
    /// A fresh `accounts()` read while connected.
    AddressResolved(String),
    BalanceResolved { address: String, balance: U256 },
}

pub struct SessionMachine {
    state: WalletState,
    session: WalletSession,
    chain_id: Option<ChainId>,
    required_chain_id: ChainId,
}

impl SessionMachine {
    pub fn new(required_chain_id: ChainId) -> Self {
        Self {
            state: WalletState::Disconnected,
            session: WalletSession::default(),
            chain_id: None,
            required_chain_id,
        }
    }

    pub fn state(&self) -> WalletState {
        self.state
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    pub fn snapshot(&self) -> WalletSnapshot {
        WalletSnapshot {
            state: self.state,
            session: self.session.clone(),
            chain_id: self.chain_id,
            required_chain_id: self.required_chain_id,
        }
    }

    /// Apply one input. Returns `true` if the published snapshot changed.
    pub fn apply(&mut self, input: SessionInput) -> bool {
        let before = self.snapshot();

        match input {
            SessionInput::ConnectRequested => {
                if self.state == WalletState::Disconnected {
                    self.state = WalletState::Connecting;
                }
            }
            SessionInput::Connected { accounts, chain_id } => {
                self.chain_id = Some(chain_id);
                match accounts.into_iter().next() {
                    Some(address) => self.enter_connected(address),
                    None => self.disconnect(),
                }
            }
            SessionInput::ConnectFailed => {
                if self.state == WalletState::Connecting {
                    self.disconnect();
                }
            }
            SessionInput::AccountsChanged(accounts) => {
                if accounts.is_empty() {
                    self.disconnect();
                } else {
                    // Re-evaluated by the manager, which follows up with
                    // `Connected` or `ConnectFailed`.
                    self.state = WalletState::Connecting;
                    self.session = WalletSession::default();
                }
            }
            SessionInput::ChainChanged(chain_id) => {
                self.chain_id = Some(chain_id);
                self.reevaluate_network();
            }
            SessionInput::RequiredChainChanged(required) => {
                self.required_chain_id = required;
                self.reevaluate_network();
            }
            SessionInput::AddressResolved(address) => {
                if self.state.is_connected() && self.session.address.as_ref() != Some(&address) {
                    self.session.address = Some(address);
                    self.session.balance = None;
                }
            }
            SessionInput::BalanceResolved { address, balance } => {
                // Ignore replies for an account the user has since switched away from.
                if self.state.is_connected() && self.session.address.as_ref() == Some(&address) {
                    self.session.balance = Some(balance.to_string());
                }
            }
        }

        self.snapshot() != before
    }

    fn enter_connected(&mut self, address: String) {
        if self.session.address.as_ref() != Some(&address) {
            self.session.balance = None;
        }
        self.session.connected = true;
        self.session.address = Some(address);
        self.reevaluate_network();
    }

    fn disconnect(&mut self) {
        self.state = WalletState::Disconnected;
        self.session = WalletSession::default();
    }

    fn reevaluate_network(&mut self) {
        if !self.session.connected {
            return;
        }
        let matched = self.chain_id == Some(self.required_chain_id);
        self.session.network_matched = matched;
        self.state = if matched {
            WalletState::ConnectedReady
        } else {
            WalletState::ConnectedWrongNetwork
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: ChainId = ChainId(513100);
    const ALICE: &str = "0x1111111111111111111111111111111111111111";
    const BOB: &str = "0x2222222222222222222222222222222222222222";

    fn connected(chain_id: ChainId) -> SessionMachine {
        let mut machine = SessionMachine::new(REQUIRED);
        machine.apply(SessionInput::ConnectRequested);
        machine.apply(SessionInput::Connected {
            accounts: vec![ALICE.to_string()],
            chain_id,
        });
        machine
    }

    fn assert_disconnected(machine: &SessionMachine) {
        assert_eq!(machine.state(), WalletState::Disconnected);
        assert_eq!(machine.session(), &WalletSession::default());
    }

    #[test]
    fn test_connect_on_required_chain_is_ready() {
        let machine = connected(REQUIRED);
        assert_eq!(machine.state(), WalletState::ConnectedReady);
        assert!(machine.session().connected);
        assert!(machine.session().network_matched);
        assert_eq!(machine.session().address.as_deref(), Some(ALICE));
    }

    #[test]
    fn test_connect_on_other_chain_is_wrong_network() {
        let machine = connected(ChainId(1));
        assert_eq!(machine.state(), WalletState::ConnectedWrongNetwork);
        assert!(machine.session().connected);
        assert!(!machine.session().network_matched);
    }

    #[test]
    fn test_connect_failure_returns_to_disconnected() {
        let mut machine = SessionMachine::new(REQUIRED);
        machine.apply(SessionInput::ConnectRequested);
        assert_eq!(machine.state(), WalletState::Connecting);
        machine.apply(SessionInput::ConnectFailed);
        assert_disconnected(&machine);
    }

    #[test]
    fn test_chain_changed_while_disconnected_stays_disconnected() {
        let mut machine = SessionMachine::new(REQUIRED);
        machine.apply(SessionInput::ChainChanged(REQUIRED));
        assert_disconnected(&machine);
        assert_eq!(machine.snapshot().chain_id, Some(REQUIRED));
    }

    #[test]
    fn test_chain_changed_toggles_network_match_only() {
        let mut machine = connected(REQUIRED);
        machine.apply(SessionInput::ChainChanged(ChainId(1)));
        assert_eq!(machine.state(), WalletState::ConnectedWrongNetwork);
        assert_eq!(machine.session().address.as_deref(), Some(ALICE));

        machine.apply(SessionInput::ChainChanged(REQUIRED));
        assert_eq!(machine.state(), WalletState::ConnectedReady);
        assert_eq!(machine.session().address.as_deref(), Some(ALICE));
    }

    #[test]
    fn test_empty_accounts_always_disconnects() {
        let mut from_ready = connected(REQUIRED);
        from_ready.apply(SessionInput::AccountsChanged(vec![]));
        assert_disconnected(&from_ready);

        let mut from_wrong = connected(ChainId(1));
        from_wrong.apply(SessionInput::AccountsChanged(vec![]));
        assert_disconnected(&from_wrong);

        let mut from_connecting = SessionMachine::new(REQUIRED);
        from_connecting.apply(SessionInput::ConnectRequested);
        from_connecting.apply(SessionInput::AccountsChanged(vec![]));
        assert_disconnected(&from_connecting);

        let mut from_disconnected = SessionMachine::new(REQUIRED);
        from_disconnected.apply(SessionInput::AccountsChanged(vec![]));
        assert_disconnected(&from_disconnected);
    }

    #[test]
    fn test_account_switch_reevaluates() {
        let mut machine = connected(REQUIRED);
        machine.apply(SessionInput::BalanceResolved {
            address: ALICE.to_string(),
            balance: U256::from(5u64),
        });

        machine.apply(SessionInput::AccountsChanged(vec![BOB.to_string()]));
        assert_eq!(machine.state(), WalletState::Connecting);
        assert!(machine.session().address.is_none());
        assert!(machine.session().balance.is_none());

        machine.apply(SessionInput::Connected {
            accounts: vec![BOB.to_string()],
            chain_id: REQUIRED,
        });
        assert_eq!(machine.state(), WalletState::ConnectedReady);
        assert_eq!(machine.session().address.as_deref(), Some(BOB));
    }

    #[test]
    fn test_balance_is_cached_only_for_current_address() {
        let mut machine = connected(REQUIRED);
        assert!(!machine.apply(SessionInput::BalanceResolved {
            address: BOB.to_string(),
            balance: U256::from(1u64),
        }));
        assert!(machine.session().balance.is_none());

        assert!(machine.apply(SessionInput::BalanceResolved {
            address: ALICE.to_string(),
            balance: U256::from(42u64),
        }));
        assert_eq!(machine.session().balance.as_deref(), Some("42"));
    }

    #[test]
    fn test_reads_do_not_populate_disconnected_session() {
        let mut machine = SessionMachine::new(REQUIRED);
        assert!(!machine.apply(SessionInput::AddressResolved(ALICE.to_string())));
        assert!(!machine.apply(SessionInput::BalanceResolved {
            address: ALICE.to_string(),
            balance: U256::from(1u64),
        }));
        assert_disconnected(&machine);
    }

    #[test]
    fn test_required_chain_change_reevaluates_match() {
        let mut machine = connected(ChainId(1));
        machine.apply(SessionInput::RequiredChainChanged(ChainId(1)));
        assert_eq!(machine.state(), WalletState::ConnectedReady);
        assert_eq!(machine.snapshot().required_chain_id, ChainId(1));
    }
}
