use bytes::Bytes;
use chrono::{TimeZone, Utc};

use basaltbft_core_state_machine::state::{RoundBlock, State, Step};
use basaltbft_core_types::{
    Address, Block, BlockHash, BlockHeader, Height, NilOr, PrivateKey, Round, Signature,
    SignedProposal, SignedVote, Timeout, Validator, ValidatorSet, Validity, Vote,
};

use basaltbft_core_driver::{Driver, Input, Output};

pub struct TestStep {
    desc: &'static str,
    input: Option<Input>,
    expected_outputs: Vec<Output>,
    expected_round: Round,
    new_state: State,
}

fn make_validators<const N: usize>(powers: [u64; N]) -> [Validator; N] {
    core::array::from_fn(|i| {
        let sk = PrivateKey::from([i as u8 + 1; 32]);
        Validator::new(sk.public_key(), powers[i])
    })
}

fn make_block(seed: u8) -> Block {
    let payload = Bytes::from(vec![seed; 8]);

    let header = BlockHeader {
        version: 1,
        height: Height::new(1),
        timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        prev_hash: BlockHash::new([0; 32]),
        payload_hash: BlockHash::new(basaltbft_codec::keccak256(&payload)),
        proposer: Address::new([seed; 20]),
    };

    Block::new(header, payload)
}

fn signed_proposal(round: Round, block: Block, pol_round: Round, addr: Address) -> SignedProposal {
    SignedProposal::new(
        basaltbft_core_types::Proposal::new(Height::new(1), round, block, pol_round, addr),
        Signature::test(),
    )
}

fn prevote_input(round: Round, block: &Block, addr: Address) -> Input {
    Input::Vote(SignedVote::new(
        Vote::new_prevote(Height::new(1), round, NilOr::Val(block.hash()), addr),
        Signature::test(),
    ))
}

fn prevote_nil_input(round: Round, addr: Address) -> Input {
    Input::Vote(SignedVote::new(
        Vote::new_prevote(Height::new(1), round, NilOr::Nil, addr),
        Signature::test(),
    ))
}

fn precommit_input(round: Round, block: &Block, addr: Address) -> Input {
    Input::Vote(SignedVote::new(
        Vote::new_precommit(Height::new(1), round, NilOr::Val(block.hash()), addr),
        Signature::test(),
    ))
}

fn precommit_nil_input(round: Round, addr: Address) -> Input {
    Input::Vote(SignedVote::new(
        Vote::new_precommit(Height::new(1), round, NilOr::Nil, addr),
        Signature::test(),
    ))
}

/// Feed a driver output back as an input, the way the engine loops our own
/// messages into the tally.
fn output_to_input(output: Output) -> Option<Input> {
    match output {
        // Our own proposals are valid by construction.
        Output::Propose(p) => Some(Input::Proposal(
            SignedProposal::new(p, Signature::test()),
            Validity::Valid,
        )),
        Output::Vote(v) => Some(Input::Vote(SignedVote::new(v, Signature::test()))),
        Output::NewRound(_, _)
        | Output::Decide(_, _)
        | Output::ScheduleTimeout(_)
        | Output::GetValue(_, _, _) => None,
    }
}

fn run_steps(driver: &mut Driver, steps: Vec<TestStep>) {
    let mut input_from_prev_output = None;

    for step in steps {
        let input = step
            .input
            .unwrap_or_else(|| input_from_prev_output.take().expect("no input for step"));

        let outputs = driver.process(input).expect("process succeeded");

        assert_eq!(outputs, step.expected_outputs, "outputs: {}", step.desc);
        assert_eq!(driver.round(), step.expected_round, "round: {}", step.desc);
        assert_eq!(driver.round_state(), &step.new_state, "state: {}", step.desc);

        input_from_prev_output = outputs.into_iter().find_map(output_to_input);
    }
}

#[test]
fn driver_steps_proposer() {
    let [v1, v2, v3] = make_validators([1, 2, 3]);
    let (my_addr, height) = (v1.address, Height::new(1));

    let vs = ValidatorSet::new(vec![v1.clone(), v2.clone(), v3.clone()]);
    let mut driver = Driver::new(height, vs, my_addr, Default::default());

    let block = make_block(9);
    let proposal =
        basaltbft_core_types::Proposal::new(height, Round::new(0), block.clone(), Round::Nil, my_addr);

    let steps = vec![
        TestStep {
            desc: "Start round 0, we are proposer, ask for a block to propose",
            input: Some(Input::NewRound(height, Round::new(0), my_addr)),
            expected_outputs: vec![
                Output::ScheduleTimeout(Timeout::propose(Round::new(0))),
                Output::GetValue(height, Round::new(0), Timeout::propose(Round::new(0))),
            ],
            expected_round: Round::new(0),
            new_state: State {
                height,
                round: Round::new(0),
                step: Step::Propose,
                locked: None,
                valid: None,
                decision: None,
            },
        },
        TestStep {
            desc: "Feed a block to propose, propose it",
            input: Some(Input::ProposeValue(Round::new(0), block.clone())),
            expected_outputs: vec![Output::Propose(proposal.clone())],
            expected_round: Round::new(0),
            new_state: State {
                height,
                round: Round::new(0),
                step: Step::Propose,
                locked: None,
                valid: None,
                decision: None,
            },
        },
        TestStep {
            desc: "Receive our own proposal, prevote it",
            input: None,
            expected_outputs: vec![Output::Vote(Vote::new_prevote(
                height,
                Round::new(0),
                NilOr::Val(block.hash()),
                my_addr,
            ))],
            expected_round: Round::new(0),
            new_state: State {
                height,
                round: Round::new(0),
                step: Step::Prevote,
                locked: None,
                valid: None,
                decision: None,
            },
        },
        TestStep {
            desc: "Receive our own prevote",
            input: None,
            expected_outputs: vec![],
            expected_round: Round::new(0),
            new_state: State {
                height,
                round: Round::new(0),
                step: Step::Prevote,
                locked: None,
                valid: None,
                decision: None,
            },
        },
        TestStep {
            desc: "v2 prevotes our proposal",
            input: Some(prevote_input(Round::new(0), &block, v2.address)),
            expected_outputs: vec![],
            expected_round: Round::new(0),
            new_state: State {
                height,
                round: Round::new(0),
                step: Step::Prevote,
                locked: None,
                valid: None,
                decision: None,
            },
        },
        TestStep {
            desc: "v3 prevotes, +2/3 power for our block, precommit it",
            input: Some(prevote_input(Round::new(0), &block, v3.address)),
            expected_outputs: vec![Output::Vote(Vote::new_precommit(
                height,
                Round::new(0),
                NilOr::Val(block.hash()),
                my_addr,
            ))],
            expected_round: Round::new(0),
            new_state: State {
                height,
                round: Round::new(0),
                step: Step::Precommit,
                locked: Some(RoundBlock::new(block.clone(), Round::new(0))),
                valid: Some(RoundBlock::new(block.clone(), Round::new(0))),
                decision: None,
            },
        },
        TestStep {
            desc: "Receive our own precommit",
            input: None,
            expected_outputs: vec![],
            expected_round: Round::new(0),
            new_state: State {
                height,
                round: Round::new(0),
                step: Step::Precommit,
                locked: Some(RoundBlock::new(block.clone(), Round::new(0))),
                valid: Some(RoundBlock::new(block.clone(), Round::new(0))),
                decision: None,
            },
        },
        TestStep {
            desc: "v2 precommits our proposal",
            input: Some(precommit_input(Round::new(0), &block, v2.address)),
            expected_outputs: vec![],
            expected_round: Round::new(0),
            new_state: State {
                height,
                round: Round::new(0),
                step: Step::Precommit,
                locked: Some(RoundBlock::new(block.clone(), Round::new(0))),
                valid: Some(RoundBlock::new(block.clone(), Round::new(0))),
                decision: None,
            },
        },
        TestStep {
            desc: "v3 precommits, +2/3 power, decide",
            input: Some(precommit_input(Round::new(0), &block, v3.address)),
            expected_outputs: vec![Output::Decide(Round::new(0), proposal.clone())],
            expected_round: Round::new(0),
            new_state: State {
                height,
                round: Round::new(0),
                step: Step::Commit,
                locked: Some(RoundBlock::new(block.clone(), Round::new(0))),
                valid: Some(RoundBlock::new(block.clone(), Round::new(0))),
                decision: Some(RoundBlock::new(block.clone(), Round::new(0))),
            },
        },
    ];

    run_steps(&mut driver, steps);
}

#[test]
fn driver_steps_not_proposer_quorum_for_block() {
    // Four equal validators; we are v0, the proposer is v1.
    let [v0, v1, v2, v3] = make_validators([1, 1, 1, 1]);
    let (my_addr, height) = (v0.address, Height::new(1));

    let vs = ValidatorSet::new(vec![v0, v1.clone(), v2.clone(), v3.clone()]);
    let mut driver = Driver::new(height, vs, my_addr, Default::default());

    let block = make_block(7);
    let proposal = signed_proposal(Round::new(0), block.clone(), Round::Nil, v1.address);

    let steps = vec![
        TestStep {
            desc: "Start round 0, we are not the proposer",
            input: Some(Input::NewRound(height, Round::new(0), v1.address)),
            expected_outputs: vec![Output::ScheduleTimeout(Timeout::propose(Round::new(0)))],
            expected_round: Round::new(0),
            new_state: State {
                height,
                round: Round::new(0),
                step: Step::Propose,
                locked: None,
                valid: None,
                decision: None,
            },
        },
        TestStep {
            desc: "Receive the proposal, prevote it",
            input: Some(Input::Proposal(proposal.clone(), Validity::Valid)),
            expected_outputs: vec![Output::Vote(Vote::new_prevote(
                height,
                Round::new(0),
                NilOr::Val(block.hash()),
                my_addr,
            ))],
            expected_round: Round::new(0),
            new_state: State {
                height,
                round: Round::new(0),
                step: Step::Prevote,
                locked: None,
                valid: None,
                decision: None,
            },
        },
        TestStep {
            desc: "v1 prevotes its own proposal",
            input: Some(prevote_input(Round::new(0), &block, v1.address)),
            expected_outputs: vec![],
            expected_round: Round::new(0),
            new_state: State {
                height,
                round: Round::new(0),
                step: Step::Prevote,
                locked: None,
                valid: None,
                decision: None,
            },
        },
        TestStep {
            desc: "v2 prevotes, 2 of 4 powers: no quorum yet",
            input: Some(prevote_input(Round::new(0), &block, v2.address)),
            expected_outputs: vec![],
            expected_round: Round::new(0),
            new_state: State {
                height,
                round: Round::new(0),
                step: Step::Prevote,
                locked: None,
                valid: None,
                decision: None,
            },
        },
        TestStep {
            desc: "v3 prevotes, +2/3 power, lock and precommit the block",
            input: Some(prevote_input(Round::new(0), &block, v3.address)),
            expected_outputs: vec![Output::Vote(Vote::new_precommit(
                height,
                Round::new(0),
                NilOr::Val(block.hash()),
                my_addr,
            ))],
            expected_round: Round::new(0),
            new_state: State {
                height,
                round: Round::new(0),
                step: Step::Precommit,
                locked: Some(RoundBlock::new(block.clone(), Round::new(0))),
                valid: Some(RoundBlock::new(block.clone(), Round::new(0))),
                decision: None,
            },
        },
        TestStep {
            desc: "v1 precommits",
            input: Some(precommit_input(Round::new(0), &block, v1.address)),
            expected_outputs: vec![],
            expected_round: Round::new(0),
            new_state: State {
                height,
                round: Round::new(0),
                step: Step::Precommit,
                locked: Some(RoundBlock::new(block.clone(), Round::new(0))),
                valid: Some(RoundBlock::new(block.clone(), Round::new(0))),
                decision: None,
            },
        },
        TestStep {
            desc: "v2 precommits",
            input: Some(precommit_input(Round::new(0), &block, v2.address)),
            expected_outputs: vec![],
            expected_round: Round::new(0),
            new_state: State {
                height,
                round: Round::new(0),
                step: Step::Precommit,
                locked: Some(RoundBlock::new(block.clone(), Round::new(0))),
                valid: Some(RoundBlock::new(block.clone(), Round::new(0))),
                decision: None,
            },
        },
        TestStep {
            desc: "v3 precommits, +2/3 power, decide",
            input: Some(precommit_input(Round::new(0), &block, v3.address)),
            expected_outputs: vec![Output::Decide(Round::new(0), proposal.message.clone())],
            expected_round: Round::new(0),
            new_state: State {
                height,
                round: Round::new(0),
                step: Step::Commit,
                locked: Some(RoundBlock::new(block.clone(), Round::new(0))),
                valid: Some(RoundBlock::new(block.clone(), Round::new(0))),
                decision: Some(RoundBlock::new(block.clone(), Round::new(0))),
            },
        },
    ];

    run_steps(&mut driver, steps);
}

#[test]
fn invalid_proposal_prevotes_nil_and_polka_nil_precommits_nil() {
    let [v0, v1, v2, v3] = make_validators([1, 1, 1, 1]);
    let (my_addr, height) = (v0.address, Height::new(1));

    let vs = ValidatorSet::new(vec![v0, v1.clone(), v2.clone(), v3.clone()]);
    let mut driver = Driver::new(height, vs, my_addr, Default::default());

    driver
        .process(Input::NewRound(height, Round::new(0), v1.address))
        .unwrap();

    // The chain rejected the proposed block: prevote nil, no timeout needed.
    let bad_block = make_block(66);
    let proposal = signed_proposal(Round::new(0), bad_block, Round::Nil, v1.address);

    let outputs = driver
        .process(Input::Proposal(proposal, Validity::Invalid))
        .unwrap();

    assert_eq!(
        outputs,
        vec![Output::Vote(Vote::new_prevote(
            height,
            Round::new(0),
            NilOr::Nil,
            my_addr,
        ))]
    );
    assert_eq!(driver.step(), Step::Prevote);

    // Everyone else prevotes nil too: precommit nil.
    driver.process(prevote_nil_input(Round::new(0), v1.address)).unwrap();
    driver.process(prevote_nil_input(Round::new(0), v2.address)).unwrap();
    let outputs = driver.process(prevote_nil_input(Round::new(0), v3.address)).unwrap();

    assert_eq!(
        outputs,
        vec![Output::Vote(Vote::new_precommit(
            height,
            Round::new(0),
            NilOr::Nil,
            my_addr,
        ))]
    );
    assert_eq!(driver.step(), Step::Precommit);
    assert_eq!(driver.round(), Round::new(0));
}

#[test]
fn lock_is_released_when_precommitting_nil() {
    let [v0, v1, v2, v3] = make_validators([1, 1, 1, 1]);
    let (my_addr, height) = (v0.address, Height::new(1));

    let vs = ValidatorSet::new(vec![v0, v1.clone(), v2.clone(), v3.clone()]);
    let mut driver = Driver::new(height, vs, my_addr, Default::default());

    // Round 0: lock on the proposed block via a polka.
    let block = make_block(7);
    let proposal = signed_proposal(Round::new(0), block.clone(), Round::Nil, v1.address);

    driver.process(Input::NewRound(height, Round::new(0), v1.address)).unwrap();
    driver.process(Input::Proposal(proposal, Validity::Valid)).unwrap();
    driver.process(prevote_input(Round::new(0), &block, v1.address)).unwrap();
    driver.process(prevote_input(Round::new(0), &block, v2.address)).unwrap();
    driver.process(prevote_input(Round::new(0), &block, v3.address)).unwrap();

    assert_eq!(driver.step(), Step::Precommit);
    assert!(driver.locked_block().is_some());

    // No precommit quorum forms; precommit timeout moves us to round 1.
    driver.process(precommit_nil_input(Round::new(0), v1.address)).unwrap();
    driver.process(precommit_nil_input(Round::new(0), v2.address)).unwrap();
    driver.process(precommit_nil_input(Round::new(0), v3.address)).unwrap();
    driver
        .process(Input::TimeoutElapsed(Timeout::precommit(Round::new(0))))
        .unwrap();

    driver.process(Input::NewRound(height, Round::new(1), v2.address)).unwrap();
    assert_eq!(driver.round(), Round::new(1));
    assert!(driver.locked_block().is_some(), "lock survives the round change");

    // Round 1 times out without a proposal; we prevote nil, a nil polka
    // forms, and precommitting nil releases the lock.
    driver
        .process(Input::TimeoutElapsed(Timeout::propose(Round::new(1))))
        .unwrap();
    driver.process(prevote_nil_input(Round::new(1), v1.address)).unwrap();
    driver.process(prevote_nil_input(Round::new(1), v2.address)).unwrap();
    let outputs = driver.process(prevote_nil_input(Round::new(1), v3.address)).unwrap();

    assert_eq!(
        outputs,
        vec![Output::Vote(Vote::new_precommit(
            height,
            Round::new(1),
            NilOr::Nil,
            my_addr,
        ))]
    );
    assert!(driver.locked_block().is_none(), "precommitting nil unlocks");
    assert!(driver.valid_block().is_some(), "the valid block is kept");
}

#[test]
fn round_skip_on_proposal_plus_prevote_from_higher_round() {
    // We are v3; the round 0 proposer (v0) stays silent.
    let [v0, v1, v2, v3] = make_validators([1, 1, 1, 1]);
    let (my_addr, height) = (v3.address, Height::new(1));

    let vs = ValidatorSet::new(vec![v0.clone(), v1.clone(), v2.clone(), v3]);
    let mut driver = Driver::new(height, vs, my_addr, Default::default());

    driver.process(Input::NewRound(height, Round::new(0), v0.address)).unwrap();
    assert_eq!(driver.step(), Step::Propose);

    // v1 proposes a block in round 1: one sender, not yet f+1 power.
    let block = make_block(11);
    let proposal = signed_proposal(Round::new(1), block.clone(), Round::Nil, v1.address);

    let outputs = driver
        .process(Input::Proposal(proposal, Validity::Valid))
        .unwrap();
    assert_eq!(outputs, vec![]);
    assert_eq!(driver.round(), Round::new(0));

    // v2 prevotes in round 1: two distinct senders make f+1, skip ahead.
    let outputs = driver.process(prevote_input(Round::new(1), &block, v2.address)).unwrap();
    assert_eq!(outputs, vec![Output::NewRound(height, Round::new(1))]);

    // The host starts round 1; the buffered proposal is replayed and we
    // end up at the prevote step of the new round.
    let outputs = driver
        .process(Input::NewRound(height, Round::new(1), v1.address))
        .unwrap();

    assert_eq!(
        outputs,
        vec![
            Output::ScheduleTimeout(Timeout::propose(Round::new(1))),
            Output::Vote(Vote::new_prevote(
                height,
                Round::new(1),
                NilOr::Val(block.hash()),
                my_addr,
            )),
        ]
    );
    assert_eq!(driver.round(), Round::new(1));
    assert_eq!(driver.step(), Step::Prevote);
}

#[test]
fn timeout_propose_prevotes_nil() {
    let [v0, v1, v2, v3] = make_validators([1, 1, 1, 1]);
    let (my_addr, height) = (v0.address, Height::new(1));

    let vs = ValidatorSet::new(vec![v0, v1.clone(), v2, v3]);
    let mut driver = Driver::new(height, vs, my_addr, Default::default());

    driver.process(Input::NewRound(height, Round::new(0), v1.address)).unwrap();

    let outputs = driver
        .process(Input::TimeoutElapsed(Timeout::propose(Round::new(0))))
        .unwrap();

    assert_eq!(
        outputs,
        vec![Output::Vote(Vote::new_prevote(
            height,
            Round::new(0),
            NilOr::Nil,
            my_addr,
        ))]
    );
    assert_eq!(driver.step(), Step::Prevote);
    assert_eq!(driver.round(), Round::new(0));
}

#[test]
fn timeout_precommit_moves_to_next_round() {
    let [v0, v1, v2, v3] = make_validators([1, 1, 1, 1]);
    let (my_addr, height) = (v0.address, Height::new(1));

    let vs = ValidatorSet::new(vec![v0, v1.clone(), v2.clone(), v3.clone()]);
    let mut driver = Driver::new(height, vs, my_addr, Default::default());

    // Get precommitted on a block in round 0.
    let block = make_block(7);
    let proposal = signed_proposal(Round::new(0), block.clone(), Round::Nil, v1.address);

    driver.process(Input::NewRound(height, Round::new(0), v1.address)).unwrap();
    driver.process(Input::Proposal(proposal, Validity::Valid)).unwrap();
    driver.process(prevote_input(Round::new(0), &block, v1.address)).unwrap();
    driver.process(prevote_input(Round::new(0), &block, v2.address)).unwrap();
    driver.process(prevote_input(Round::new(0), &block, v3.address)).unwrap();
    assert_eq!(driver.step(), Step::Precommit);

    // Precommits arrive mixed: one for the block, two nil. No quorum for
    // a single value, but +2/3 precommit power arms the timeout.
    driver.process(precommit_input(Round::new(0), &block, v1.address)).unwrap();
    driver.process(precommit_nil_input(Round::new(0), v2.address)).unwrap();
    let outputs = driver.process(precommit_nil_input(Round::new(0), v3.address)).unwrap();

    assert_eq!(
        outputs,
        vec![Output::ScheduleTimeout(Timeout::precommit(Round::new(0)))]
    );

    // The timeout fires: move to round 1.
    let outputs = driver
        .process(Input::TimeoutElapsed(Timeout::precommit(Round::new(0))))
        .unwrap();
    assert_eq!(outputs, vec![Output::NewRound(height, Round::new(1))]);

    let outputs = driver
        .process(Input::NewRound(height, Round::new(1), v2.address))
        .unwrap();
    assert_eq!(
        outputs,
        vec![Output::ScheduleTimeout(Timeout::propose(Round::new(1)))]
    );
    assert_eq!(driver.round(), Round::new(1));
    assert_eq!(driver.step(), Step::Propose);
}

#[test]
fn stale_timeouts_are_ignored() {
    let [v0, v1, v2, v3] = make_validators([1, 1, 1, 1]);
    let (my_addr, height) = (v0.address, Height::new(1));

    let vs = ValidatorSet::new(vec![v0, v1.clone(), v2, v3]);
    let mut driver = Driver::new(height, vs, my_addr, Default::default());

    driver.process(Input::NewRound(height, Round::new(1), v1.address)).unwrap();

    // A propose timeout for a round we have left changes nothing.
    let outputs = driver
        .process(Input::TimeoutElapsed(Timeout::propose(Round::new(0))))
        .unwrap();

    assert_eq!(outputs, vec![]);
    assert_eq!(driver.round(), Round::new(1));
    assert_eq!(driver.step(), Step::Propose);
}

#[test]
fn equivocating_votes_are_retained_but_not_tallied() {
    let [v0, v1, v2, v3] = make_validators([1, 1, 1, 1]);
    let (my_addr, height) = (v0.address, Height::new(1));

    let vs = ValidatorSet::new(vec![v0, v1.clone(), v2.clone(), v3.clone()]);
    let mut driver = Driver::new(height, vs, my_addr, Default::default());

    let block = make_block(7);
    let other = make_block(8);
    let proposal = signed_proposal(Round::new(0), block.clone(), Round::Nil, v1.address);

    driver.process(Input::NewRound(height, Round::new(0), v1.address)).unwrap();
    driver.process(Input::Proposal(proposal, Validity::Valid)).unwrap();

    driver.process(prevote_input(Round::new(0), &block, v1.address)).unwrap();
    driver.process(prevote_input(Round::new(0), &block, v2.address)).unwrap();

    // v2 flips its prevote to another block: evidence, no tally change.
    driver.process(prevote_input(Round::new(0), &other, v2.address)).unwrap();
    assert_eq!(driver.evidence().total(), 1);
    assert!(driver.evidence().get(&v2.address).is_some());

    // The canonical first prevote still counts towards the polka.
    let outputs = driver.process(prevote_input(Round::new(0), &block, v3.address)).unwrap();
    assert_eq!(
        outputs,
        vec![Output::Vote(Vote::new_precommit(
            height,
            Round::new(0),
            NilOr::Val(block.hash()),
            my_addr,
        ))]
    );
}

#[test]
fn vote_for_wrong_height_is_rejected() {
    let [v0, v1, v2, v3] = make_validators([1, 1, 1, 1]);
    let (my_addr, height) = (v0.address, Height::new(1));

    let vs = ValidatorSet::new(vec![v0, v1.clone(), v2, v3]);
    let mut driver = Driver::new(height, vs, my_addr, Default::default());

    driver.process(Input::NewRound(height, Round::new(0), v1.address)).unwrap();

    let stale = Input::Vote(SignedVote::new(
        Vote::new_prevote(Height::new(2), Round::new(0), NilOr::Nil, v1.address),
        Signature::test(),
    ));

    assert!(driver.process(stale).is_err());
}
