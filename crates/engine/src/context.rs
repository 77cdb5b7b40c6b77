//! The per-height consensus context and its consumer task.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use basaltbft_core_driver::{Driver, Input as DriverInput, Output as DriverOutput};
use basaltbft_core_state_machine::state::Step;
use basaltbft_core_types::{
    ConsensusMsg, Height, PrivateKey, Proposal, Round, SignedProposal, SignedVote, Timeout,
    TimeoutConfig, Validity, ValidatorSet,
};

use crate::chain::{BlockChain, ChainError};
use crate::events::{Event, Observer, Observers};
use crate::fault::Fault;
use crate::signer::Ed25519Signer;
use crate::status::ContextStatus;
use crate::timers::TimeoutScheduler;
use crate::transport::BroadcastSink;

/// Construction parameters for a [`Context`].
pub struct ContextParams {
    /// The private key this validator signs with.
    pub private_key: PrivateKey,

    /// The height this context decides.
    pub height: Height,

    /// The validator roster for this height.
    pub validator_set: ValidatorSet,

    /// Timeout durations.
    pub timeouts: TimeoutConfig,
}

/// What lands in the mailbox: inbound messages, timer fires, and the
/// cooperative stop signal.
enum Msg {
    Consensus(ConsensusMsg),
    Timeout(Timeout),
    Stop,
}

impl From<Timeout> for Msg {
    fn from(timeout: Timeout) -> Self {
        Msg::Timeout(timeout)
    }
}

/// The per-height consensus context.
///
/// All state lives on a single consumer task: producers enqueue onto the
/// mailbox and return immediately, and exactly one event is processed to
/// completion at a time. The context runs until it commits a block or is
/// stopped; it is single-use.
pub struct Context {
    tx_mailbox: mpsc::UnboundedSender<Msg>,
    status: watch::Receiver<ContextStatus>,
    task: Option<ConsensusTask>,
    handle: Option<JoinHandle<()>>,
}

impl Context {
    /// Create a context for one height.
    ///
    /// `chain` supplies tip access, block building, validation, and the
    /// final append; `sink` carries this validator's own messages out to
    /// the transport.
    pub fn new(
        params: ContextParams,
        chain: Arc<dyn BlockChain>,
        sink: Arc<dyn BroadcastSink>,
    ) -> Self {
        let (tx_mailbox, rx_mailbox) = mpsc::unbounded_channel();

        let signer = Ed25519Signer::new(params.private_key);
        let driver = Driver::new(
            params.height,
            params.validator_set.clone(),
            *signer.address(),
            Default::default(),
        );

        let (status_tx, status_rx) =
            watch::channel(ContextStatus::from_round_state(driver.round_state()));

        let scheduler = TimeoutScheduler::new(params.timeouts, tx_mailbox.clone());

        let task = ConsensusTask {
            height: params.height,
            validator_set: params.validator_set,
            driver,
            signer,
            chain,
            sink,
            observers: Observers::new(),
            scheduler,
            rx_mailbox,
            status_tx,
            done: false,
        };

        Self {
            tx_mailbox,
            status: status_rx,
            task: Some(task),
            handle: None,
        }
    }

    /// Register an observer. Observers registered after `start()` are
    /// ignored.
    pub fn register_observer(&mut self, observer: Arc<dyn Observer>) {
        match &mut self.task {
            Some(task) => task.observers.register(observer),
            None => warn!("Observer registered after start, ignoring"),
        }
    }

    /// Start the context: enter round 0 and begin consuming the mailbox.
    /// Idempotent.
    pub fn start(&mut self) {
        if let Some(task) = self.task.take() {
            self.handle = Some(tokio::spawn(task.run()));
        }
    }

    /// Enqueue an inbound consensus message. Non-blocking; duplicates and
    /// garbage are dealt with by the consumer, never reported here.
    pub fn produce_message(&self, msg: ConsensusMsg) {
        let _ = self.tx_mailbox.send(Msg::Consensus(msg));
    }

    /// Ask the context to stop. The consumer finishes the event it is on,
    /// then cancels all timers and exits.
    pub fn stop(&self) {
        let _ = self.tx_mailbox.send(Msg::Stop);
    }

    /// The latest state snapshot.
    pub fn status(&self) -> ContextStatus {
        self.status.borrow().clone()
    }

    /// The latest state snapshot, as a JSON object string.
    pub fn to_debug_string(&self) -> String {
        self.status().to_json()
    }

    /// Wait for the consumer task to finish (after a commit or a stop).
    pub async fn wait(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        let _ = self.tx_mailbox.send(Msg::Stop);
    }
}

/// The state owned by the consumer task.
struct ConsensusTask {
    height: Height,
    validator_set: ValidatorSet,
    driver: Driver,
    signer: Ed25519Signer,
    chain: Arc<dyn BlockChain>,
    sink: Arc<dyn BroadcastSink>,
    observers: Observers,
    scheduler: TimeoutScheduler<Msg>,
    rx_mailbox: mpsc::UnboundedReceiver<Msg>,
    status_tx: watch::Sender<ContextStatus>,
    done: bool,
}

impl ConsensusTask {
    async fn run(mut self) {
        info!(height = %self.height, address = %self.signer.address(), "Starting consensus");

        self.enter_round(Round::ZERO);
        self.finish_event((Round::Nil, Step::Unstarted));

        while !self.done {
            let Some(msg) = self.rx_mailbox.recv().await else {
                break;
            };

            let before = (self.driver.round(), self.driver.step());

            match msg {
                Msg::Consensus(msg) => self.on_consensus_msg(msg),
                Msg::Timeout(timeout) => self.on_timeout(timeout),
                Msg::Stop => {
                    self.fault(Fault::Cancelled);
                    break;
                }
            }

            self.finish_event(before);
        }

        self.scheduler.cancel_all();
        info!(height = %self.height, "Consensus stopped");
    }

    /// Enter the given round: stale timers go away, the round's proposer
    /// is selected, and the state machine starts the round.
    fn enter_round(&mut self, round: Round) {
        self.scheduler.cancel_below(round);

        let proposer = self.validator_set.select_proposer(self.height, round).address;
        debug!(height = %self.height, %round, proposer = %proposer, "Entering round");

        self.process_input(DriverInput::NewRound(self.height, round, proposer));
    }

    /// Post-event bookkeeping: drop timers made stale by the transition,
    /// surface the state change, publish the status snapshot.
    fn finish_event(&mut self, before: (Round, Step)) {
        let after = (self.driver.round(), self.driver.step());

        if before != after {
            match after.1 {
                Step::Prevote => self.scheduler.cancel(&Timeout::propose(after.0)),
                Step::Precommit => {
                    self.scheduler.cancel(&Timeout::propose(after.0));
                    self.scheduler.cancel(&Timeout::prevote(after.0));
                }
                Step::Commit => self.scheduler.cancel_all(),
                Step::Unstarted | Step::Propose => {}
            }

            self.observers.send(|| Event::StateChanged {
                round: after.0,
                step: after.1,
            });
        }

        self.status_tx
            .send_replace(ContextStatus::from_round_state(self.driver.round_state()));
    }

    /// Validate and apply an inbound consensus message.
    ///
    /// Checks are in fixed order: height, sender membership, signature,
    /// and, for proposals, the proposer schedule and the block itself.
    /// Every failure drops the message and surfaces a fault.
    fn on_consensus_msg(&mut self, msg: ConsensusMsg) {
        if msg.height() != self.height {
            return self.fault(Fault::HeightMismatch {
                got: msg.height(),
                expected: self.height,
            });
        }

        let sender = *msg.sender();

        let Some(validator) = self.validator_set.get_by_address(&sender) else {
            return self.fault(Fault::UnknownValidator(sender));
        };

        if !self.signer.verify_msg(&msg, &validator.public_key) {
            return self.fault(Fault::InvalidSignature(sender));
        }

        match msg {
            ConsensusMsg::Proposal(proposal) => self.on_proposal(proposal),
            ConsensusMsg::Vote(vote) => self.on_vote(vote),
        }
    }

    fn on_proposal(&mut self, proposal: SignedProposal) {
        let round = proposal.round();

        if round.is_nil() {
            debug!("Dropping proposal with nil round");
            return;
        }

        let expected = self.validator_set.select_proposer(self.height, round).address;
        if proposal.proposer() != &expected {
            return self.fault(Fault::WrongProposer {
                got: *proposal.proposer(),
                expected,
            });
        }

        let validity = match self.chain.validate_next_block(&proposal.message.block) {
            Ok(()) => Validity::Valid,
            Err(ChainError::InvalidHeader(reason)) => {
                self.fault(Fault::InvalidBlockHeader(reason));
                Validity::Invalid
            }
            Err(e) => {
                self.fault(Fault::InvalidBlockContent(e.to_string()));
                Validity::Invalid
            }
        };

        self.process_input(DriverInput::Proposal(proposal, validity));
    }

    fn on_vote(&mut self, vote: SignedVote) {
        let sender = *vote.validator_address();
        let evidence_before = self.driver.evidence().total();

        self.process_input(DriverInput::Vote(vote));

        if self.driver.evidence().total() > evidence_before {
            self.fault(Fault::Equivocation(sender));
        }
    }

    fn on_timeout(&mut self, timeout: Timeout) {
        if !self.scheduler.try_finish(&timeout) {
            // Cancelled after its fire was already queued: no state change.
            debug!(%timeout, "Ignoring cancelled timeout");
            return;
        }

        self.observers.send(|| Event::TimeoutProcessed {
            kind: timeout.kind,
            round: timeout.round,
        });

        self.process_input(DriverInput::TimeoutElapsed(timeout));
    }

    /// Run an input through the driver, acting on every output. Outputs
    /// can queue further inputs (our own messages loop back into the
    /// tally, a round change starts the next round); the queue drains
    /// before the next mailbox event is looked at.
    fn process_input(&mut self, input: DriverInput) {
        let mut queue = VecDeque::new();
        queue.push_back(input);

        while let Some(input) = queue.pop_front() {
            let outputs = match self.driver.process(input) {
                Ok(outputs) => outputs,
                Err(e) => {
                    warn!(error = %e, "Driver rejected input");
                    continue;
                }
            };

            for output in outputs {
                self.handle_output(output, &mut queue);

                if self.done {
                    return;
                }
            }
        }
    }

    fn handle_output(&mut self, output: DriverOutput, queue: &mut VecDeque<DriverInput>) {
        match output {
            DriverOutput::NewRound(height, round) => {
                self.scheduler.cancel_below(round);

                let proposer = self.validator_set.select_proposer(height, round).address;
                debug!(%round, proposer = %proposer, "Entering round");

                queue.push_back(DriverInput::NewRound(height, round, proposer));
            }

            DriverOutput::Propose(proposal) => {
                let signed = self.signer.sign_proposal(proposal);
                let msg = ConsensusMsg::Proposal(signed.clone());

                self.sink.broadcast(msg.clone());
                self.observers.send(|| Event::MessageBroadcast { message: msg });

                // Our own block: built or previously validated by the chain.
                queue.push_back(DriverInput::Proposal(signed, Validity::Valid));
            }

            DriverOutput::Vote(vote) => {
                let signed = self.signer.sign_vote(vote);
                let msg = ConsensusMsg::Vote(signed.clone());

                self.sink.broadcast(msg.clone());
                self.observers.send(|| Event::MessageBroadcast { message: msg });

                queue.push_back(DriverInput::Vote(signed));
            }

            DriverOutput::ScheduleTimeout(timeout) => self.scheduler.schedule(timeout),

            DriverOutput::GetValue(_height, round, _timeout) => {
                match self.chain.propose_block(self.signer.private_key()) {
                    Ok(block) => queue.push_back(DriverInput::ProposeValue(round, block)),
                    Err(e) => {
                        // The propose timeout is already armed; when it
                        // fires we prevote nil.
                        warn!(error = %e, %round, "Failed to build a block to propose");
                    }
                }
            }

            DriverOutput::Decide(round, proposal) => self.decide(round, proposal),
        }
    }

    /// Append the decided block. Success commits and finishes the context;
    /// failure to append is fatal.
    fn decide(&mut self, round: Round, proposal: Proposal) {
        let block = proposal.block;
        let hash = block.hash();
        let commit = self.driver.commit_for(round, hash);

        match self.chain.append(block, commit) {
            Ok(()) => {
                info!(height = %self.height, %round, %hash, "Block committed");
                self.scheduler.cancel_all();
                self.observers.send(|| Event::BlockCommitted { hash });
            }
            Err(e) => {
                error!(error = %e, %hash, "Failed to append decided block");
                self.fault(Fault::AppendFailed(hash));
            }
        }

        self.done = true;
    }

    fn fault(&mut self, fault: Fault) {
        warn!(%fault, "Consensus fault");
        self.observers.send(|| Event::ExceptionOccurred { fault: fault.clone() });
    }
}
