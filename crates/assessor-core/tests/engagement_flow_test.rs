//! End-to-end chat turns against an in-memory store and a manual clock.

use std::collections::HashSet;
use std::sync::Arc;

use assessor_core::{
    ChatService, Domain, ManualClock, Message, SafeStore, SqliteProfileStore,
};
use chrono::{TimeZone, Utc};

const REPLY_PREFIXES: [&str; 9] = [
    "❓ Pergunta rápida: ",
    "👀 Observação: ",
    "💡 Insight: ",
    "🔎 Pergunta profunda: ",
    "🧠 Micro-insight: ",
    "🎯 Micro-missão: ",
    "🔁 Zeigarnik: ",
    "📅 Check-in: ",
    "✨ ",
];

fn setup() -> (SafeStore, ChatService) {
    let store = SafeStore::new(Arc::new(SqliteProfileStore::in_memory().unwrap()));
    // Monday 09:00 UTC
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
    ));
    (store.clone(), ChatService::new(store, clock))
}

#[tokio::test]
async fn test_first_message_scenario() {
    let (store, chat) = setup();
    let turn = chat
        .process_user_message(1, "Prefiro estudar de manhã, tenho uma rotina.", &[])
        .await
        .unwrap();

    let detected = &turn.profile.detected_domains;
    assert!(detected.contains(&Domain::Learning));
    assert!(detected.contains(&Domain::Performance));

    // one message: nothing is due for insights yet
    assert!(turn.engagement.insights.is_empty());
    assert!(store.list_insights(1).is_empty());

    let core = store.get_core(1);
    assert!(core
        .behavior
        .preferences
        .contains(&"Preferência detectada: prefiro".to_string()));

    assert_eq!(turn.engagement.micro_missions.len(), 1);
    assert_eq!(turn.engagement.check_ins.len(), 1);
    assert!(turn.engagement.zeigarnik_hooks.is_empty());
}

#[tokio::test]
async fn test_reply_blocks_in_order_with_placeholders() {
    let (_, chat) = setup();
    let turn = chat
        .process_user_message(1, "Prefiro estudar de manhã, tenho uma rotina.", &[])
        .await
        .unwrap();

    let lines: Vec<&str> = turn.engagement.reply.content.split('\n').collect();
    assert_eq!(lines.len(), REPLY_PREFIXES.len());
    for (line, prefix) in lines.iter().zip(REPLY_PREFIXES) {
        assert!(line.starts_with(prefix), "{:?} should start with {:?}", line, prefix);
    }

    assert_eq!(
        lines[1],
        "👀 Observação: Estou entrando em ritmo com você em tempo real."
    );
    assert_eq!(lines[4], "🧠 Micro-insight: Vou registrar o que você disse.");
    assert_eq!(
        lines[6],
        "🔁 Zeigarnik: Me avisa se quiser que eu guarde algo em aberto."
    );
    // Monday 09:00 gives variety seed 33
    assert_eq!(
        lines[7],
        "📅 Check-in: Qual é a intenção principal para hoje? (responda em uma frase)"
    );
    assert_eq!(lines[8], "✨ Estou acompanhando você em tempo real.");
}

#[tokio::test]
async fn test_observation_mirrors_last_assistant_message() {
    let (_, chat) = setup();
    let history = vec![
        Message::user("Oi"),
        Message::assistant("metas curtas"),
    ];
    let turn = chat.process_user_message(1, "Bora", &history).await.unwrap();
    assert_eq!(
        turn.engagement.rhythm.observation,
        "Notei que você reagiu bem quando falei sobre: metas curtas"
    );
}

#[tokio::test]
async fn test_insights_are_never_repeated() {
    let (store, chat) = setup();
    let message = "Prefiro cuidar da saúde todo dia";

    let mut emitted = Vec::new();
    for turn_number in 1..=8 {
        let turn = chat.process_user_message(2, message, &[]).await.unwrap();
        if turn_number == 4 {
            assert!(!turn.engagement.insights.is_empty());
        }
        if turn_number == 8 {
            assert!(turn.engagement.insights.is_empty());
        }
        emitted.extend(turn.engagement.insights.into_iter().map(|i| i.label));
    }

    let stored: Vec<String> = store.list_insights(2).into_iter().map(|i| i.label).collect();
    assert_eq!(stored, emitted);
    let unique: HashSet<&String> = stored.iter().collect();
    assert_eq!(unique.len(), stored.len());
    assert!(stored.contains(&"Domínio ativo: saúde".to_string()));
}

#[tokio::test]
async fn test_standalone_plan_does_not_log() {
    let (store, chat) = setup();
    chat.process_user_message(3, "Primeira conversa", &[]).await.unwrap();

    // a check-in was just issued, so nothing is due
    assert!(chat.plan_standalone_check_ins(3).is_empty());
    assert_eq!(store.list_recent_messages(3, 10).len(), 1);
}
