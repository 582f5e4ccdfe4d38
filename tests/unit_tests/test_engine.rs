// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use quiznet::{
    catalog::{Catalog, Difficulty},
    models::request::AnswerValue,
    server::clients::ClientRegistry,
    session::{
        JoinError, JokerError, Mode, Session, SessionConfig, SessionStatus,
        StartError,
        engine::{RoundOutcome, RoundWait},
    },
};

use crate::unit_tests::{drain, fake_clients, next_frame, write_fixture_catalog};

const GRACE: Duration = Duration::from_secs(1);

fn fixture_catalog() -> Catalog {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture_catalog(dir.path());
    Catalog::load(&path, 200, 20).expect("load fixture")
}

fn make_session(
    mode: Mode,
    lives: i32,
    question_ids: Vec<u32>,
    creator: u32,
    max_players: usize,
) -> Session {
    let cfg = SessionConfig {
        name: "test game".to_string(),
        theme_ids: vec![0],
        difficulty: Difficulty::Easy,
        num_questions: question_ids.len(),
        time_limit: 20,
        mode,
        initial_lives: if mode.is_battle() { lives } else { 0 },
        max_players,
    };
    Session::new(7, cfg, question_ids, creator)
}

/// Boolean question ids from the fixture (correct answer: true).
fn booleans(n: usize) -> Vec<u32> {
    (1..=n as u32).collect()
}

#[tokio::test]
async fn test_join_notifies_earlier_players() {
    let registry = ClientRegistry::new(10);
    let mut clients = fake_clients(&registry, 3);
    let session = make_session(Mode::Solo, 0, booleans(10), clients[0].0.id, 2);

    let snap = session
        .join(&registry, clients[0].0.id, "alice")
        .await
        .expect("creator joins");
    assert!(snap.is_creator);
    assert_eq!(snap.players, vec!["alice"]);
    assert!(snap.lives.is_none());
    assert!(next_frame(&mut clients[0].1).is_none());

    let snap = session
        .join(&registry, clients[1].0.id, "bob")
        .await
        .expect("bob joins");
    assert!(!snap.is_creator);
    assert_eq!(snap.players, vec!["alice", "bob"]);

    let joined = next_frame(&mut clients[0].1).expect("alice notified");
    assert_eq!(joined["action"], "session/player/joined");
    assert_eq!(joined["pseudo"], "bob");
    assert_eq!(joined["nbPlayers"], 2);
    assert!(next_frame(&mut clients[1].1).is_none());

    assert_eq!(
        session.join(&registry, clients[1].0.id, "bob").await.unwrap_err(),
        JoinError::AlreadyJoined
    );
    assert_eq!(
        session.join(&registry, clients[2].0.id, "carol").await.unwrap_err(),
        JoinError::Full
    );
}

#[tokio::test]
async fn test_begin_checks() {
    let registry = ClientRegistry::new(10);
    let mut clients = fake_clients(&registry, 2);
    let session = make_session(Mode::Solo, 0, booleans(10), clients[0].0.id, 4);

    session.join(&registry, clients[0].0.id, "alice").await.expect("join");
    assert_eq!(
        session
            .begin(&registry, clients[0].0.id, Duration::from_secs(3))
            .await
            .unwrap_err(),
        StartError::NotEnoughPlayers
    );

    session.join(&registry, clients[1].0.id, "bob").await.expect("join");
    assert_eq!(
        session
            .begin(&registry, clients[1].0.id, Duration::from_secs(3))
            .await
            .unwrap_err(),
        StartError::NotCreator
    );

    drain(&mut clients[0].1);
    session
        .begin(&registry, clients[0].0.id, Duration::from_secs(3))
        .await
        .expect("start");
    assert_eq!(session.status().await, SessionStatus::Playing);

    for (_, rx) in clients.iter_mut() {
        let started = next_frame(rx).expect("started frame");
        assert_eq!(started["action"], "session/started");
        assert_eq!(started["countdown"], 3);
    }

    assert_eq!(
        session
            .begin(&registry, clients[0].0.id, Duration::from_secs(3))
            .await
            .unwrap_err(),
        StartError::AlreadyStarted
    );
}

#[tokio::test]
async fn test_round_completion_scoring_and_advance() {
    let catalog = fixture_catalog();
    let registry = ClientRegistry::new(10);
    let mut clients = fake_clients(&registry, 2);
    let (alice, bob) = (clients[0].0.id, clients[1].0.id);
    let session = make_session(Mode::Solo, 0, booleans(10), alice, 4);

    session.join(&registry, alice, "alice").await.expect("join");
    session.join(&registry, bob, "bob").await.expect("join");
    session
        .begin(&registry, alice, Duration::ZERO)
        .await
        .expect("start");
    for (_, rx) in clients.iter_mut() {
        drain(rx);
    }

    session
        .dispatch_question(&catalog, &registry, GRACE)
        .await
        .expect("deadline");
    for (_, rx) in clients.iter_mut() {
        let q = next_frame(rx).expect("question frame");
        assert_eq!(q["action"], "question/new");
        assert_eq!(q["questionNum"], 1);
        assert_eq!(q["totalQuestions"], 10);
        assert_eq!(q["type"], "boolean");
        assert_eq!(q["difficulty"], "easy");
        assert_eq!(q["timeLimit"], 20);
        assert!(q.get("answers").is_none());
    }

    assert_eq!(session.round_wait().await, RoundWait::Pending);
    session
        .record_answer(&catalog, alice, Some(AnswerValue::Bool(true)), 2.0, GRACE)
        .await;
    assert_eq!(session.round_wait().await, RoundWait::Pending);
    // A second answer from the same player is ignored.
    session
        .record_answer(&catalog, alice, Some(AnswerValue::Bool(false)), 3.0, GRACE)
        .await;
    session
        .record_answer(&catalog, bob, Some(AnswerValue::Bool(false)), 6.0, GRACE)
        .await;
    assert_eq!(session.round_wait().await, RoundWait::Complete);

    assert_eq!(
        session.emit_results(&catalog, &registry).await,
        RoundOutcome::Continue
    );
    for (_, rx) in clients.iter_mut() {
        let results = next_frame(rx).expect("results frame");
        assert_eq!(results["action"], "question/results");
        assert_eq!(results["correctAnswer"], 1);
        assert_eq!(results["explanation"], "Statement 1 holds");
        // Solo mode carries no battle fields.
        assert!(results.get("lastPlayer").is_none());

        let entries = results["results"].as_array().expect("entries");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["pseudo"], "alice");
        assert_eq!(entries[0]["answer"], 1);
        assert_eq!(entries[0]["correct"], true);
        assert_eq!(entries[0]["points"], 6);
        assert_eq!(entries[0]["totalScore"], 6);
        assert!(entries[0].get("lives").is_none());
        assert_eq!(entries[1]["pseudo"], "bob");
        assert_eq!(entries[1]["correct"], false);
        assert_eq!(entries[1]["points"], 0);
    }

    session.advance().await;
    session
        .dispatch_question(&catalog, &registry, GRACE)
        .await
        .expect("second question");
    for (_, rx) in clients.iter_mut() {
        let q = next_frame(rx).expect("question 2");
        assert_eq!(q["questionNum"], 2);
    }
}

#[tokio::test]
async fn test_deadline_resolution_without_all_answers() {
    let catalog = fixture_catalog();
    let registry = ClientRegistry::new(10);
    let mut clients = fake_clients(&registry, 2);
    let (alice, bob) = (clients[0].0.id, clients[1].0.id);
    let session = make_session(Mode::Battle, 3, booleans(10), alice, 4);

    session.join(&registry, alice, "alice").await.expect("join");
    session.join(&registry, bob, "bob").await.expect("join");
    session.begin(&registry, alice, Duration::ZERO).await.expect("start");
    session
        .dispatch_question(&catalog, &registry, GRACE)
        .await
        .expect("dispatch");
    session
        .record_answer(&catalog, alice, Some(AnswerValue::Bool(true)), 2.0, GRACE)
        .await;
    for (_, rx) in clients.iter_mut() {
        drain(rx);
    }

    // The runner resolves at the deadline even though bob never answered.
    assert_eq!(session.round_wait().await, RoundWait::Pending);
    assert_eq!(
        session.emit_results(&catalog, &registry).await,
        RoundOutcome::Continue
    );

    let results = next_frame(&mut clients[1].1).expect("results frame");
    let entries = results["results"].as_array().expect("entries");
    assert_eq!(entries[1]["pseudo"], "bob");
    assert_eq!(entries[1]["answer"], -1);
    assert_eq!(entries[1]["correct"], false);
    // Not answering costs no life.
    assert_eq!(entries[1]["lives"], 3);
}

#[tokio::test]
async fn test_battle_elimination_ends_session() {
    let catalog = fixture_catalog();
    let registry = ClientRegistry::new(10);
    let mut clients = fake_clients(&registry, 2);
    let (alice, bob) = (clients[0].0.id, clients[1].0.id);
    let session = make_session(Mode::Battle, 1, booleans(10), alice, 4);

    session.join(&registry, alice, "alice").await.expect("join");
    session.join(&registry, bob, "bob").await.expect("join");
    session.begin(&registry, alice, Duration::ZERO).await.expect("start");
    session
        .dispatch_question(&catalog, &registry, GRACE)
        .await
        .expect("dispatch");
    for (_, rx) in clients.iter_mut() {
        drain(rx);
    }

    // Both wrong with a single life: double elimination.
    session
        .record_answer(&catalog, alice, Some(AnswerValue::Bool(false)), 2.0, GRACE)
        .await;
    session
        .record_answer(&catalog, bob, Some(AnswerValue::Bool(false)), 4.0, GRACE)
        .await;
    assert_eq!(
        session.emit_results(&catalog, &registry).await,
        RoundOutcome::Ended
    );
    assert_eq!(session.status().await, SessionStatus::Finished);

    for (_, rx) in clients.iter_mut() {
        let results = next_frame(rx).expect("results frame");
        assert_eq!(results["action"], "question/results");
        assert_eq!(results["lastPlayer"], "bob");
        let entries = results["results"].as_array().expect("entries");
        assert_eq!(entries[0]["lives"], 0);
        assert_eq!(entries[1]["lives"], 0);

        for expected in ["alice", "bob"] {
            let elim = next_frame(rx).expect("elimination frame");
            assert_eq!(elim["action"], "session/player/eliminated");
            assert_eq!(elim["pseudo"], expected);
        }

        let finished = next_frame(rx).expect("finished frame");
        assert_eq!(finished["action"], "session/finished");
        assert_eq!(finished["mode"], "battle");
        // Full tie: the stable sort keeps join order.
        assert_eq!(finished["winner"], "alice");
        let ranking = finished["ranking"].as_array().expect("ranking");
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0]["rank"], 1);
        assert_eq!(ranking[0]["pseudo"], "alice");
        assert_eq!(ranking[0]["eliminatedAt"], 1);
    }
}

#[tokio::test]
async fn test_slowest_correct_player_loses_a_life() {
    let catalog = fixture_catalog();
    let registry = ClientRegistry::new(10);
    let mut clients = fake_clients(&registry, 2);
    let (alice, bob) = (clients[0].0.id, clients[1].0.id);
    let session = make_session(Mode::Battle, 2, booleans(10), alice, 4);

    session.join(&registry, alice, "alice").await.expect("join");
    session.join(&registry, bob, "bob").await.expect("join");
    session.begin(&registry, alice, Duration::ZERO).await.expect("start");
    session
        .dispatch_question(&catalog, &registry, GRACE)
        .await
        .expect("dispatch");
    for (_, rx) in clients.iter_mut() {
        drain(rx);
    }

    session
        .record_answer(&catalog, alice, Some(AnswerValue::Bool(true)), 2.0, GRACE)
        .await;
    session
        .record_answer(&catalog, bob, Some(AnswerValue::Bool(true)), 9.0, GRACE)
        .await;
    assert_eq!(
        session.emit_results(&catalog, &registry).await,
        RoundOutcome::Continue
    );

    let results = next_frame(&mut clients[0].1).expect("results frame");
    assert_eq!(results["lastPlayer"], "bob");
    let entries = results["results"].as_array().expect("entries");
    assert_eq!(entries[0]["pseudo"], "alice");
    assert_eq!(entries[0]["lives"], 2);
    assert_eq!(entries[1]["pseudo"], "bob");
    assert_eq!(entries[1]["correct"], true);
    assert_eq!(entries[1]["lives"], 1);
}

#[tokio::test]
async fn test_skip_counts_as_answered_and_dodges_life_loss() {
    let catalog = fixture_catalog();
    let registry = ClientRegistry::new(10);
    let mut clients = fake_clients(&registry, 2);
    let (alice, bob) = (clients[0].0.id, clients[1].0.id);
    let session = make_session(Mode::Battle, 1, booleans(10), alice, 4);

    session.join(&registry, alice, "alice").await.expect("join");
    session.join(&registry, bob, "bob").await.expect("join");
    session.begin(&registry, alice, Duration::ZERO).await.expect("start");
    session
        .dispatch_question(&catalog, &registry, GRACE)
        .await
        .expect("dispatch");
    for (_, rx) in clients.iter_mut() {
        drain(rx);
    }

    let jokers = session.use_skip(alice).await.expect("skip");
    assert_eq!(jokers.fifty, 1);
    assert_eq!(jokers.skip, 0);
    // Single use per session.
    assert_eq!(session.use_skip(alice).await.unwrap_err(), JokerError::NotAvailable);
    assert_eq!(session.round_wait().await, RoundWait::Pending);

    session
        .record_answer(&catalog, bob, Some(AnswerValue::Bool(false)), 3.0, GRACE)
        .await;
    assert_eq!(session.round_wait().await, RoundWait::Complete);
    assert_eq!(
        session.emit_results(&catalog, &registry).await,
        RoundOutcome::Ended
    );

    let results = next_frame(&mut clients[0].1).expect("results frame");
    let entries = results["results"].as_array().expect("entries");
    assert_eq!(entries[0]["pseudo"], "alice");
    assert_eq!(entries[0]["answer"], -2);
    assert_eq!(entries[0]["points"], 0);
    assert_eq!(entries[0]["lives"], 1);
    assert_eq!(entries[1]["pseudo"], "bob");
    assert_eq!(entries[1]["lives"], 0);

    let finished_for_alice = {
        let mut frame = next_frame(&mut clients[0].1).expect("next frame");
        if frame["action"] == "session/player/eliminated" {
            frame = next_frame(&mut clients[0].1).expect("finished");
        }
        frame
    };
    assert_eq!(finished_for_alice["action"], "session/finished");
    assert_eq!(finished_for_alice["winner"], "alice");
}

#[tokio::test]
async fn test_fifty_joker_rules() {
    let catalog = fixture_catalog();
    let registry = ClientRegistry::new(10);
    let clients = fake_clients(&registry, 2);
    let (alice, bob) = (clients[0].0.id, clients[1].0.id);
    // Question 1 is boolean, question 13 is multi-choice.
    let session = make_session(Mode::Solo, 0, vec![1, 13], alice, 4);

    session.join(&registry, alice, "alice").await.expect("join");
    session.join(&registry, bob, "bob").await.expect("join");
    session.begin(&registry, alice, Duration::ZERO).await.expect("start");
    session
        .dispatch_question(&catalog, &registry, GRACE)
        .await
        .expect("dispatch boolean");

    // Not a multi-choice question: rejected, joker stays unused.
    assert_eq!(
        session.use_fifty(&catalog, alice).await.unwrap_err(),
        JokerError::NotAvailable
    );

    session
        .record_answer(&catalog, alice, Some(AnswerValue::Bool(true)), 1.0, GRACE)
        .await;
    session
        .record_answer(&catalog, bob, Some(AnswerValue::Bool(true)), 2.0, GRACE)
        .await;
    session.emit_results(&catalog, &registry).await;
    session.advance().await;
    session
        .dispatch_question(&catalog, &registry, GRACE)
        .await
        .expect("dispatch multi-choice");

    let outcome = session.use_fifty(&catalog, alice).await.expect("fifty");
    assert_eq!(outcome.remaining_answers.len(), 2);
    // The correct option always survives.
    assert!(outcome.remaining_answers.contains(&"Beta".to_string()));
    assert_eq!(outcome.jokers.fifty, 0);
    assert_eq!(outcome.jokers.skip, 1);

    assert_eq!(
        session.use_fifty(&catalog, alice).await.unwrap_err(),
        JokerError::NotAvailable
    );

    // Answered players cannot use it either.
    session
        .record_answer(&catalog, bob, Some(AnswerValue::Number(1)), 2.0, GRACE)
        .await;
    assert_eq!(
        session.use_fifty(&catalog, bob).await.unwrap_err(),
        JokerError::NotAvailable
    );
}

#[tokio::test]
async fn test_leave_hands_over_creator_and_abandons_game() {
    let catalog = fixture_catalog();
    let registry = ClientRegistry::new(10);
    let mut clients = fake_clients(&registry, 3);
    let (alice, bob, carol) = (clients[0].0.id, clients[1].0.id, clients[2].0.id);
    let session = make_session(Mode::Solo, 0, booleans(10), alice, 4);

    session.join(&registry, alice, "alice").await.expect("join");
    session.join(&registry, bob, "bob").await.expect("join");
    session.join(&registry, carol, "carol").await.expect("join");
    for (_, rx) in clients.iter_mut() {
        drain(rx);
    }

    // Creator leaves while waiting: creatorship moves to bob.
    assert!(session.leave(&registry, alice).await);
    for (_, rx) in clients.iter_mut().skip(1) {
        let left = next_frame(rx).expect("left frame");
        assert_eq!(left["action"], "session/player/left");
        assert_eq!(left["pseudo"], "alice");
        assert_eq!(left["reason"], "disconnected");
    }
    session
        .begin(&registry, bob, Duration::ZERO)
        .await
        .expect("new creator can start");
    session
        .dispatch_question(&catalog, &registry, GRACE)
        .await
        .expect("dispatch");
    for (_, rx) in clients.iter_mut() {
        drain(rx);
    }

    // One of two players leaving mid-game ends it with final results.
    assert!(session.leave(&registry, bob).await);
    assert_eq!(session.status().await, SessionStatus::Finished);
    let left = next_frame(&mut clients[2].1).expect("left frame");
    assert_eq!(left["action"], "session/player/left");
    let finished = next_frame(&mut clients[2].1).expect("finished frame");
    assert_eq!(finished["action"], "session/finished");
    assert_eq!(finished["ranking"].as_array().expect("ranking").len(), 1);

    // Leaving a session you are not in is a no-op.
    assert!(!session.leave(&registry, alice).await);
}
