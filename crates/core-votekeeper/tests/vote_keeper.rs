use basaltbft_core_types::{
    Address, BlockHash, Height, NilOr, PrivateKey, Round, Signature, SignedVote, Validator,
    ValidatorSet, Vote,
};

use basaltbft_core_votekeeper::keeper::{Output, VoteKeeper};

fn setup<const N: usize>(powers: [u64; N]) -> ([Address; N], VoteKeeper) {
    let mut addrs = [Address::new([0; 20]); N];
    let mut validators = Vec::with_capacity(N);

    for i in 0..N {
        let sk = PrivateKey::from([i as u8 + 1; 32]);
        addrs[i] = Address::from_public_key(&sk.public_key());
        validators.push(Validator::new(sk.public_key(), powers[i]));
    }

    let keeper = VoteKeeper::new(ValidatorSet::new(validators), Default::default());
    (addrs, keeper)
}

fn new_signed_prevote(round: Round, hash: NilOr<BlockHash>, addr: Address) -> SignedVote {
    SignedVote::new(
        Vote::new_prevote(Height::new(1), round, hash, addr),
        Signature::test(),
    )
}

fn new_signed_precommit(round: Round, hash: NilOr<BlockHash>, addr: Address) -> SignedVote {
    SignedVote::new(
        Vote::new_precommit(Height::new(1), round, hash, addr),
        Signature::test(),
    )
}

const HASH: BlockHash = BlockHash::new([0xaa; 32]);
const OTHER: BlockHash = BlockHash::new([0xbb; 32]);

#[test]
fn polka_nil() {
    let ([addr1, addr2, addr3, _], mut keeper) = setup([1, 1, 1, 1]);
    let round = Round::new(0);

    let msg = keeper.apply_vote(new_signed_prevote(round, NilOr::Nil, addr1), round);
    assert_eq!(msg, None);

    let msg = keeper.apply_vote(new_signed_prevote(round, NilOr::Nil, addr2), round);
    assert_eq!(msg, None);

    let msg = keeper.apply_vote(new_signed_prevote(round, NilOr::Nil, addr3), round);
    assert_eq!(msg, Some(Output::PolkaNil));
}

#[test]
fn polka_value_after_polka_any() {
    let ([addr1, addr2, addr3, addr4], mut keeper) = setup([1, 1, 1, 1]);
    let round = Round::new(0);

    let msg = keeper.apply_vote(new_signed_prevote(round, NilOr::Val(HASH), addr1), round);
    assert_eq!(msg, None);

    let msg = keeper.apply_vote(new_signed_prevote(round, NilOr::Val(HASH), addr2), round);
    assert_eq!(msg, None);

    // A third prevote, but for nil: quorum of prevotes, no common block.
    let msg = keeper.apply_vote(new_signed_prevote(round, NilOr::Nil, addr3), round);
    assert_eq!(msg, Some(Output::PolkaAny));

    let msg = keeper.apply_vote(new_signed_prevote(round, NilOr::Val(HASH), addr4), round);
    assert_eq!(msg, Some(Output::PolkaValue(HASH)));
}

#[test]
fn precommit_value() {
    let ([addr1, addr2, addr3, _], mut keeper) = setup([1, 1, 1, 1]);
    let round = Round::new(0);

    let msg = keeper.apply_vote(new_signed_precommit(round, NilOr::Val(HASH), addr1), round);
    assert_eq!(msg, None);

    let msg = keeper.apply_vote(new_signed_precommit(round, NilOr::Val(HASH), addr2), round);
    assert_eq!(msg, None);

    let msg = keeper.apply_vote(new_signed_precommit(round, NilOr::Val(HASH), addr3), round);
    assert_eq!(msg, Some(Output::PrecommitValue(HASH)));
}

#[test]
fn quorum_counts_power_not_votes() {
    // One validator holds a quorum of power on its own.
    let ([heavy, light1, light2, light3], mut keeper) = setup([7, 1, 1, 1]);
    let round = Round::new(0);

    let msg = keeper.apply_vote(new_signed_prevote(round, NilOr::Val(HASH), light1), round);
    assert_eq!(msg, None);

    let msg = keeper.apply_vote(new_signed_prevote(round, NilOr::Val(HASH), light2), round);
    assert_eq!(msg, None);

    // Three votes, but only 3 of 10 power: nothing fires.
    let msg = keeper.apply_vote(new_signed_prevote(round, NilOr::Val(HASH), light3), round);
    assert_eq!(msg, None);

    let msg = keeper.apply_vote(new_signed_prevote(round, NilOr::Val(HASH), heavy), round);
    assert_eq!(msg, Some(Output::PolkaValue(HASH)));
}

#[test]
fn duplicates_are_absorbed() {
    let ([addr1, addr2, addr3, _], mut keeper) = setup([1, 1, 1, 1]);
    let round = Round::new(0);

    let vote = new_signed_prevote(round, NilOr::Val(HASH), addr1);
    assert_eq!(keeper.apply_vote(vote.clone(), round), None);
    assert!(keeper.has_vote(&vote));

    // The same vote again changes nothing, no matter how often it arrives.
    assert_eq!(keeper.apply_vote(vote.clone(), round), None);
    assert_eq!(keeper.apply_vote(vote, round), None);

    keeper.apply_vote(new_signed_prevote(round, NilOr::Val(HASH), addr2), round);
    let msg = keeper.apply_vote(new_signed_prevote(round, NilOr::Val(HASH), addr3), round);
    assert_eq!(msg, Some(Output::PolkaValue(HASH)));
}

#[test]
fn equivocation_keeps_first_vote_canonical() {
    let ([addr1, addr2, addr3, _], mut keeper) = setup([1, 1, 1, 1]);
    let round = Round::new(0);

    keeper.apply_vote(new_signed_prevote(round, NilOr::Val(HASH), addr1), round);
    keeper.apply_vote(new_signed_prevote(round, NilOr::Val(HASH), addr2), round);

    // addr2 flips to another block: recorded as evidence, not tallied.
    let msg = keeper.apply_vote(new_signed_prevote(round, NilOr::Val(OTHER), addr2), round);
    assert_eq!(msg, None);
    assert_eq!(keeper.evidence().total(), 1);
    assert!(keeper.evidence().get(&addr2).is_some());

    // The first votes still count towards the polka.
    let msg = keeper.apply_vote(new_signed_prevote(round, NilOr::Val(HASH), addr3), round);
    assert_eq!(msg, Some(Output::PolkaValue(HASH)));
}

#[test]
fn skip_round_on_f_plus_one_votes() {
    let ([addr1, addr2, _, _], mut keeper) = setup([1, 1, 1, 1]);
    let cur_round = Round::new(0);
    let fut_round = Round::new(1);

    let msg = keeper.apply_vote(new_signed_prevote(fut_round, NilOr::Val(HASH), addr1), cur_round);
    assert_eq!(msg, None);

    // Second distinct sender at the higher round: f+1 power reached.
    let msg = keeper.apply_vote(new_signed_precommit(fut_round, NilOr::Nil, addr2), cur_round);
    assert_eq!(msg, Some(Output::SkipRound(fut_round)));
}

#[test]
fn skip_round_counts_proposal_senders() {
    let ([proposer, voter, _, _], mut keeper) = setup([1, 1, 1, 1]);
    let cur_round = Round::new(0);
    let fut_round = Round::new(1);

    // A proposal for round 1 alone is not enough.
    let msg = keeper.apply_round_message(fut_round, &proposer, cur_round);
    assert_eq!(msg, None);

    // One prevote from a distinct validator tips it over f+1.
    let msg = keeper.apply_vote(new_signed_prevote(fut_round, NilOr::Val(HASH), voter), cur_round);
    assert_eq!(msg, Some(Output::SkipRound(fut_round)));
}

#[test]
fn skip_round_fires_once() {
    let ([addr1, addr2, addr3, _], mut keeper) = setup([1, 1, 1, 1]);
    let cur_round = Round::new(0);
    let fut_round = Round::new(1);

    keeper.apply_vote(new_signed_prevote(fut_round, NilOr::Val(HASH), addr1), cur_round);

    let msg = keeper.apply_vote(new_signed_prevote(fut_round, NilOr::Nil, addr2), cur_round);
    assert_eq!(msg, Some(Output::SkipRound(fut_round)));

    let msg = keeper.apply_vote(new_signed_prevote(fut_round, NilOr::Nil, addr3), cur_round);
    assert_ne!(msg, Some(Output::SkipRound(fut_round)));
}

#[test]
fn unknown_validator_is_ignored() {
    let ([_, _, _, _], mut keeper) = setup([1, 1, 1, 1]);
    let round = Round::new(0);

    let stranger = Address::new([0xff; 20]);
    let msg = keeper.apply_vote(new_signed_prevote(round, NilOr::Val(HASH), stranger), round);

    assert_eq!(msg, None);
    assert!(keeper.per_round(round).is_none());
}
