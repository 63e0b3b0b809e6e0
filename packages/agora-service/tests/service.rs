mod service {
	use std::{
		collections::{HashMap, VecDeque},
		sync::{
			Arc, Mutex,
			atomic::{AtomicBool, AtomicUsize, Ordering},
		},
	};

	use async_trait::async_trait;

	use agora_providers::partition::{PartitionGroup, PartitionOutcome};
	use agora_service::{
		AgoraService, BoxFuture, DocumentGateway, EmbeddingProvider, Error, PartitionProvider,
		Providers, RelationalGateway, Result, SimilarityHit,
	};
	use agora_storage::models::{
		ClusterSummary, ForumDocument, ParticipantAssignment, StoredEmbedding, TopicAssignment,
		TopicRecord,
	};

	fn test_config() -> agora_config::Config {
		agora_config::Config {
			service: agora_config::Service { log_level: "info".to_string() },
			storage: agora_config::Storage {
				postgres: agora_config::Postgres {
					dsn: "postgres://localhost/agora".to_string(),
					pool_max_conns: 2,
					vector_dim: 2,
				},
				mongo: agora_config::Mongo {
					url: "mongodb://localhost".to_string(),
					database: "agora".to_string(),
					threads_collection: "threads".to_string(),
					documents_collection: "documents".to_string(),
				},
			},
			providers: agora_config::Providers {
				embedding: agora_config::EmbeddingProviderConfig {
					provider_id: "test".to_string(),
					api_base: "http://localhost".to_string(),
					api_key: "key".to_string(),
					path: "/embed".to_string(),
					model: "test-embed".to_string(),
					dimensions: 2,
					timeout_ms: 1_000,
					default_headers: serde_json::Map::new(),
				},
				partition: agora_config::PartitionProviderConfig {
					provider_id: "test".to_string(),
					api_base: "http://localhost".to_string(),
					api_key: "key".to_string(),
					path: "/partition".to_string(),
					model: "test-partition".to_string(),
					timeout_ms: 1_000,
					default_headers: serde_json::Map::new(),
				},
			},
			views: agora_config::Views::default(),
		}
	}

	/// Deterministic stand-in for both external capabilities. Embeddings
	/// derive from text length; partition outcomes replay a script and fall
	/// back to a single catch-all group.
	struct FakeProvider {
		partition_calls: AtomicUsize,
		script: Mutex<VecDeque<std::result::Result<PartitionOutcome, String>>>,
	}

	impl FakeProvider {
		fn new() -> Arc<Self> {
			Arc::new(Self {
				partition_calls: AtomicUsize::new(0),
				script: Mutex::new(VecDeque::new()),
			})
		}

		fn push(&self, outcome: PartitionOutcome) {
			self.script.lock().unwrap().push_back(Ok(outcome));
		}

		fn push_failure(&self, message: &str) {
			self.script.lock().unwrap().push_back(Err(message.to_string()));
		}

		fn providers(self: &Arc<Self>) -> Providers {
			Providers::new(self.clone(), self.clone())
		}
	}

	impl EmbeddingProvider for FakeProvider {
		fn embed<'a>(
			&'a self,
			_cfg: &'a agora_config::EmbeddingProviderConfig,
			texts: &'a [String],
		) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
			Box::pin(async move {
				tokio::task::yield_now().await;

				Ok(texts.iter().map(|text| vec![text.len() as f32, 1.]).collect())
			})
		}
	}

	impl PartitionProvider for FakeProvider {
		fn partition<'a>(
			&'a self,
			_cfg: &'a agora_config::PartitionProviderConfig,
			items: &'a [String],
			_vectors: &'a [Vec<f32>],
			_k: Option<u32>,
		) -> BoxFuture<'a, color_eyre::Result<PartitionOutcome>> {
			Box::pin(async move {
				tokio::task::yield_now().await;

				self.partition_calls.fetch_add(1, Ordering::SeqCst);

				match self.script.lock().unwrap().pop_front() {
					Some(Ok(outcome)) => Ok(outcome),
					Some(Err(message)) => Err(color_eyre::eyre::eyre!(message)),
					None => Ok(PartitionOutcome {
						labels: vec![0; items.len()],
						groups: vec![PartitionGroup {
							label: 0,
							name: "0_general".to_string(),
							keywords: vec!["general".to_string()],
							size: items.len() as i64,
						}],
					}),
				}
			})
		}
	}

	#[derive(Default)]
	struct FakeRelational {
		embeddings: Vec<StoredEmbedding>,
		similarities: HashMap<(String, String), f64>,
		tables_exist: AtomicBool,
		topic_writes: Mutex<Vec<(Vec<TopicRecord>, Vec<TopicAssignment>)>>,
		participant_writes: Mutex<Vec<(Vec<ParticipantAssignment>, Vec<ClusterSummary>)>>,
		persisted_topics: Mutex<(Vec<TopicRecord>, Vec<TopicAssignment>)>,
		persisted_participants: Mutex<Vec<ParticipantAssignment>>,
	}

	#[async_trait]
	impl RelationalGateway for FakeRelational {
		async fn load_embeddings(&self) -> Vec<StoredEmbedding> {
			self.embeddings.clone()
		}

		async fn similarity_between(&self, first: &str, second: &str) -> Option<f64> {
			self.similarities.get(&(first.to_string(), second.to_string())).copied()
		}

		async fn similar_to_document(&self, _id: &str, _limit: i64) -> Vec<SimilarityHit> {
			Vec::new()
		}

		async fn similar_to_vector(&self, _vector: &[f32], _limit: i64) -> Vec<SimilarityHit> {
			Vec::new()
		}

		async fn topic_tables_exist(&self) -> bool {
			tokio::task::yield_now().await;

			self.tables_exist.load(Ordering::SeqCst)
		}

		async fn replace_topic_view(
			&self,
			records: &[TopicRecord],
			assignments: &[TopicAssignment],
		) -> Result<()> {
			self.topic_writes.lock().unwrap().push((records.to_vec(), assignments.to_vec()));
			*self.persisted_topics.lock().unwrap() = (records.to_vec(), assignments.to_vec());
			self.tables_exist.store(true, Ordering::SeqCst);

			Ok(())
		}

		async fn load_topic_records(&self) -> Vec<TopicRecord> {
			tokio::task::yield_now().await;

			self.persisted_topics.lock().unwrap().0.clone()
		}

		async fn load_topic_assignments(&self) -> Vec<TopicAssignment> {
			tokio::task::yield_now().await;

			self.persisted_topics.lock().unwrap().1.clone()
		}

		async fn replace_participant_view(
			&self,
			assignments: &[ParticipantAssignment],
			summaries: &[ClusterSummary],
		) -> Result<()> {
			self.participant_writes
				.lock()
				.unwrap()
				.push((assignments.to_vec(), summaries.to_vec()));
			*self.persisted_participants.lock().unwrap() = assignments.to_vec();

			Ok(())
		}

		async fn load_participant_assignments(&self) -> Vec<ParticipantAssignment> {
			self.persisted_participants.lock().unwrap().clone()
		}
	}

	#[derive(Default)]
	struct FakeDocuments {
		documents: Vec<ForumDocument>,
	}

	#[async_trait]
	impl DocumentGateway for FakeDocuments {
		async fn find_by_id(&self, id: &str) -> Option<ForumDocument> {
			self.documents.iter().find(|doc| doc.id == id).cloned()
		}

		async fn list_threads(&self) -> Vec<ForumDocument> {
			self.documents.iter().filter(|doc| doc.thread_id.is_none()).cloned().collect()
		}

		async fn thread_bodies(&self) -> HashMap<String, String> {
			self.documents
				.iter()
				.filter(|doc| doc.thread_id.is_none())
				.map(|doc| (doc.id.clone(), doc.body.clone()))
				.collect()
		}
	}

	fn thread(id: &str, title: &str, body: &str) -> ForumDocument {
		ForumDocument {
			id: id.to_string(),
			title: title.to_string(),
			body: body.to_string(),
			..Default::default()
		}
	}

	fn reply(id: &str, thread_id: &str) -> ForumDocument {
		ForumDocument {
			id: id.to_string(),
			thread_id: Some(thread_id.to_string()),
			..Default::default()
		}
	}

	fn embedding(id: &str) -> StoredEmbedding {
		StoredEmbedding { id: id.to_string(), vector: vec![1., 0.], thread_id: None }
	}

	fn assignment(user_id: &str, cluster_id: i32, feature_vector: Vec<f32>) -> ParticipantAssignment {
		ParticipantAssignment {
			user_id: user_id.to_string(),
			cluster_id,
			engagement_score: 1.,
			message_count: 1,
			vote_count: 0,
			comment_count: 0,
			course_ids: Vec::new(),
			feature_vector,
		}
	}

	fn service(
		relational: FakeRelational,
		documents: FakeDocuments,
		provider: &Arc<FakeProvider>,
	) -> AgoraService {
		AgoraService::with_parts(
			test_config(),
			Arc::new(relational),
			Arc::new(documents),
			provider.providers(),
		)
	}

	#[tokio::test]
	async fn topic_cache_serves_stale_data_until_forced() {
		let provider = FakeProvider::new();
		let relational =
			FakeRelational { embeddings: vec![embedding("t1")], ..Default::default() };
		let documents =
			FakeDocuments { documents: vec![thread("t1", "Intro", "hello world")] };
		let service = service(relational, documents, &provider);

		let first = service.topics().await.unwrap();
		let second = service.topics().await.unwrap();

		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(provider.partition_calls.load(Ordering::SeqCst), 1);

		let forced = service.force_reload_topics().await.unwrap();

		assert!(!Arc::ptr_eq(&first, &forced));
		assert_eq!(provider.partition_calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn topic_view_hydrates_from_persisted_tables_without_recompute() {
		let provider = FakeProvider::new();
		let relational = FakeRelational {
			tables_exist: AtomicBool::new(true),
			persisted_topics: Mutex::new((
				vec![
					TopicRecord {
						topic_id: 0,
						name: "0_python".to_string(),
						keywords: vec!["python".to_string()],
						message_count: 2,
					},
					TopicRecord {
						topic_id: 1,
						name: "1_devoirs".to_string(),
						keywords: vec!["devoir".to_string()],
						message_count: 2,
					},
				],
				vec![
					TopicAssignment { message_id: "t1".to_string(), topic_id: 0 },
					TopicAssignment { message_id: "t2".to_string(), topic_id: 0 },
					TopicAssignment { message_id: "t3".to_string(), topic_id: 1 },
					// No document carries this id; hydration keeps a
					// placeholder body for it.
					TopicAssignment { message_id: "t9".to_string(), topic_id: 1 },
				],
			)),
			..Default::default()
		};
		let documents = FakeDocuments {
			documents: vec![
				thread("t1", "Boucles", "comment faire une boucle"),
				thread("t2", "Listes", "trier une liste"),
				thread("t3", "Devoir 1", "question sur le devoir"),
			],
		};
		let service = service(relational, documents, &provider);
		let view = service.topics().await.unwrap();

		assert_eq!(provider.partition_calls.load(Ordering::SeqCst), 0);
		assert_eq!(view.stats.total_topics, 2);
		assert_eq!(view.stats.total_messages, 4);
		assert_eq!(view.stats.mean_messages_per_topic, 2.0);
		assert_eq!(view.details[&1].messages, vec![
			"question sur le devoir".to_string(),
			String::new()
		]);
	}

	#[tokio::test]
	async fn topic_pipeline_drops_threads_missing_title_or_body() {
		let provider = FakeProvider::new();
		let relational = FakeRelational {
			embeddings: vec![embedding("t1"), embedding("t2")],
			..Default::default()
		};
		let documents = FakeDocuments {
			documents: vec![thread("t1", "Intro", "hello"), thread("t2", "Vide", "")],
		};
		let service = service(relational, documents, &provider);
		let view = service.topics().await.unwrap();

		assert!(view.stats.total_topics >= 1);
		assert_eq!(view.stats.total_messages, 1);
		assert!(view.details[&0].messages.contains(&"hello".to_string()));

		// The write path persisted exactly the surviving thread.
		assert_eq!(service.relational.load_topic_assignments().await, vec![TopicAssignment {
			message_id: "t1".to_string(),
			topic_id: 0
		}]);
	}

	#[tokio::test]
	async fn topic_recompute_is_idempotent() {
		let provider = FakeProvider::new();
		let relational =
			FakeRelational { embeddings: vec![embedding("t1"), embedding("t2")], ..Default::default() };
		let documents = FakeDocuments {
			documents: vec![thread("t1", "Intro", "hello"), thread("t2", "Suite", "world")],
		};
		let service = service(relational, documents, &provider);
		let first = service.force_reload_topics().await.unwrap();
		let second = service.force_reload_topics().await.unwrap();

		assert_eq!(first.stats, second.stats);
		assert_eq!(
			service.relational.load_topic_records().await.len(),
			first.topics.len()
		);
		assert_eq!(
			service.relational.load_topic_assignments().await,
			vec![
				TopicAssignment { message_id: "t1".to_string(), topic_id: 0 },
				TopicAssignment { message_id: "t2".to_string(), topic_id: 0 },
			]
		);
	}

	#[tokio::test]
	async fn presentation_threads_are_excluded_from_topics() {
		let provider = FakeProvider::new();

		// First call is the two-way title+category split; label 1 marks the
		// presentation side.
		provider.push(PartitionOutcome { labels: vec![1, 0], groups: Vec::new() });

		let relational =
			FakeRelational { embeddings: vec![embedding("t1"), embedding("t2")], ..Default::default() };
		let mut presentation = thread("t1", "Présentez-vous", "bonjour je suis la");
		let mut course_thread = thread("t2", "Boucles", "comment faire une boucle");

		presentation.category = "Présentation".to_string();
		course_thread.category = "Semaine 1".to_string();

		let documents = FakeDocuments { documents: vec![presentation, course_thread] };
		let service = service(relational, documents, &provider);
		let view = service.topics().await.unwrap();

		assert_eq!(view.stats.total_messages, 1);
		assert_eq!(service.relational.load_topic_assignments().await, vec![TopicAssignment {
			message_id: "t2".to_string(),
			topic_id: 0
		}]);
	}

	#[tokio::test]
	async fn failed_recompute_persists_nothing_and_retries() {
		let provider = FakeProvider::new();

		provider.push_failure("partition backend unavailable");

		let relational =
			FakeRelational { embeddings: vec![embedding("t1")], ..Default::default() };
		let documents = FakeDocuments { documents: vec![thread("t1", "Intro", "hello")] };
		let service = service(relational, documents, &provider);

		let err = service.topics().await.unwrap_err();

		assert!(matches!(err, Error::Provider { .. }));
		assert!(!service.relational.topic_tables_exist().await);

		// The slot stays unset, so the next read runs the pipeline again and
		// succeeds on the scripted fallback.
		let view = service.topics().await.unwrap();

		assert_eq!(view.stats.total_messages, 1);
		assert_eq!(provider.partition_calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn concurrent_forced_reloads_share_one_recompute() {
		let provider = FakeProvider::new();
		let relational =
			FakeRelational { embeddings: vec![embedding("t1")], ..Default::default() };
		let documents = FakeDocuments { documents: vec![thread("t1", "Intro", "hello")] };
		let service = service(relational, documents, &provider);

		service.topics().await.unwrap();

		let (first, second) =
			tokio::join!(service.force_reload_topics(), service.force_reload_topics());
		let (first, second) = (first.unwrap(), second.unwrap());

		assert!(Arc::ptr_eq(&first, &second));
		// One recompute for the initial load, one shared by both forced calls.
		assert_eq!(provider.partition_calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn forced_reload_queued_behind_a_hydrate_still_recomputes() {
		let provider = FakeProvider::new();
		let relational = FakeRelational {
			embeddings: vec![embedding("t1")],
			tables_exist: AtomicBool::new(true),
			persisted_topics: Mutex::new((
				vec![TopicRecord {
					topic_id: 7,
					name: "7_stale".to_string(),
					keywords: vec!["stale".to_string()],
					message_count: 1,
				}],
				vec![TopicAssignment { message_id: "t1".to_string(), topic_id: 7 }],
			)),
			..Default::default()
		};
		let documents = FakeDocuments { documents: vec![thread("t1", "Intro", "hello")] };
		let service = service(relational, documents, &provider);

		// The non-forced call hydrates the stale persisted view; the forced
		// call queues behind it and must not adopt a hydrate as if it were
		// a recompute.
		let (hydrated, forced) = tokio::join!(service.topics(), service.force_reload_topics());
		let (hydrated, forced) = (hydrated.unwrap(), forced.unwrap());

		assert_eq!(hydrated.topics[0].name, "7_stale");
		assert_eq!(forced.topics[0].name, "0_general");
		assert_eq!(provider.partition_calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn participant_view_loads_persisted_assignments_before_recomputing() {
		let provider = FakeProvider::new();
		let relational = FakeRelational {
			persisted_participants: Mutex::new(vec![
				assignment("u1", 0, vec![1., 0.]),
				assignment("u2", 0, vec![0., 1.]),
				assignment("u3", 1, vec![1., 1.]),
			]),
			..Default::default()
		};
		let service = service(relational, FakeDocuments::default(), &provider);
		let view = service.participant_view(None, false).await.unwrap();

		assert_eq!(provider.partition_calls.load(Ordering::SeqCst), 0);
		assert_eq!(view.assignments.len(), 3);
		assert_eq!(view.summaries.len(), 2);
		assert_eq!(view.summaries[0].member_count, 2);
	}

	#[tokio::test]
	async fn participant_recompute_clusters_and_persists() {
		let provider = FakeProvider::new();

		provider.push(PartitionOutcome { labels: vec![0, 1], groups: Vec::new() });

		let relational = FakeRelational {
			embeddings: vec![
				embedding("t1"),
				embedding("t2"),
				embedding("t3"),
				// u2 owns t5, which has no stored vector of its own; this
				// reply vector maps back to u2 through the thread.
				StoredEmbedding {
					id: "r1".to_string(),
					vector: vec![0., 1.],
					thread_id: Some("t5".to_string()),
				},
			],
			..Default::default()
		};
		let mut docs = vec![
			thread("t1", "Q1", "a"),
			thread("t2", "Q2", "b"),
			thread("t3", "Q3", "c"),
			thread("t4", "Q4", "d"),
			thread("t5", "Q5", "e"),
		];

		for doc in docs.iter_mut().take(4) {
			doc.user_id = Some("u1".to_string());
		}

		docs[0].votes = 3;
		docs[0].comment_count = 2;
		docs[0].course_id = Some("c1".to_string());
		docs[4].user_id = Some("u2".to_string());

		let documents = FakeDocuments { documents: docs };
		let service = service(relational, documents, &provider);
		let view = service.participant_view(None, true).await.unwrap();

		assert_eq!(view.assignments.len(), 2);

		let u1 = view.assignments.iter().find(|a| a.user_id == "u1").unwrap();

		// votes=3, comments=2, messages=4 weighs in at 3 + 4 + 12.
		assert_eq!(u1.engagement_score, 19.);
		assert_eq!(u1.cluster_id, 0);
		assert_eq!(u1.course_ids, vec!["c1".to_string()]);
		// Two embedding dimensions plus the three engagement columns.
		assert_eq!(u1.feature_vector.len(), 5);
		assert_eq!(service.relational.load_participant_assignments().await.len(), 2);
	}

	#[tokio::test]
	async fn participant_recompute_fails_without_any_embedded_user() {
		let provider = FakeProvider::new();
		let mut doc = thread("t1", "Q1", "a");

		doc.user_id = Some("u1".to_string());

		let relational = FakeRelational::default();
		let documents = FakeDocuments { documents: vec![doc] };
		let service = service(relational, documents, &provider);
		let err = service.participant_view(None, true).await.unwrap_err();

		assert!(matches!(err, Error::IncompleteData { .. }));
		assert!(service.relational.load_participant_assignments().await.is_empty());
	}

	#[tokio::test]
	async fn concurrent_forced_participant_recomputes_share_output() {
		let provider = FakeProvider::new();
		let mut doc = thread("t1", "Q1", "a");

		doc.user_id = Some("u1".to_string());

		let relational =
			FakeRelational { embeddings: vec![embedding("t1")], ..Default::default() };
		let documents = FakeDocuments { documents: vec![doc] };
		let service = service(relational, documents, &provider);
		let (first, second) = tokio::join!(
			service.participant_view(None, true),
			service.participant_view(None, true)
		);

		assert_eq!(first.unwrap().assignments, second.unwrap().assignments);
		assert_eq!(provider.partition_calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn recommendations_stay_within_the_users_cluster() {
		let provider = FakeProvider::new();
		let relational = FakeRelational {
			persisted_participants: Mutex::new(vec![
				assignment("u1", 0, vec![1., 0.]),
				assignment("u2", 0, vec![1., 0.1]),
				assignment("u3", 0, vec![0., 1.]),
				assignment("u4", 1, vec![1., 0.]),
			]),
			..Default::default()
		};
		let service = service(relational, FakeDocuments::default(), &provider);
		let recommendations = service.recommend_similar_users("u1", None).await.unwrap();
		let ids =
			recommendations.iter().map(|r| r.user_id.as_str()).collect::<Vec<_>>();

		assert_eq!(ids, vec!["u2", "u3"]);
		assert!(recommendations[0].similarity > recommendations[1].similarity);
		assert!(service.recommend_similar_users("unknown", None).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn top_courses_rank_by_member_count_per_cluster() {
		let provider = FakeProvider::new();
		let mut u1 = assignment("u1", 0, vec![1.]);
		let mut u2 = assignment("u2", 0, vec![1.]);
		let mut u3 = assignment("u3", 0, vec![1.]);

		u1.course_ids = vec!["python".to_string(), "stats".to_string()];
		u2.course_ids = vec!["python".to_string()];
		u3.course_ids = vec!["stats".to_string(), "python".to_string()];

		let relational = FakeRelational {
			persisted_participants: Mutex::new(vec![u1, u2, u3]),
			..Default::default()
		};
		let service = service(relational, FakeDocuments::default(), &provider);
		let top = service.top_courses(Some(1)).await.unwrap();

		assert_eq!(top[&0].len(), 1);
		assert_eq!(top[&0][0].course_id, "python");
		assert_eq!(top[&0][0].user_count, 3);
	}

	#[tokio::test]
	async fn similarity_output_deduplicates_on_id_and_title() {
		let provider = FakeProvider::new();
		let documents = FakeDocuments {
			documents: vec![thread("t1", "Intro", "hello"), thread("t2", "Suite", "world")],
		};
		let service = service(FakeRelational::default(), documents, &provider);
		let hits = vec![
			SimilarityHit { id: "t1".to_string(), score: 0.9 },
			SimilarityHit { id: "t2".to_string(), score: 0.7 },
			SimilarityHit { id: "t1".to_string(), score: 0.5 },
		];
		let results = service.aggregate_similar(&hits).await.unwrap();

		assert_eq!(results.len(), 2);
		assert_eq!(results[0].id, "t1");
		assert_eq!(results[0].similarity_score, 0.9);
		assert_eq!(results[1].id, "t2");
	}

	#[tokio::test]
	async fn child_hits_fold_into_their_parent_thread() {
		let provider = FakeProvider::new();
		let relational = FakeRelational {
			similarities: HashMap::from([
				(("t1".to_string(), "c1".to_string()), 0.42),
				(("t2".to_string(), "c3".to_string()), 0.3),
			]),
			..Default::default()
		};
		let documents = FakeDocuments {
			documents: vec![
				thread("t1", "Intro", "hello"),
				thread("t2", "Suite", "world"),
				reply("c1", "t1"),
				reply("c2", "t1"),
				reply("c3", "t2"),
			],
		};
		let service = service(relational, documents, &provider);
		let hits = vec![
			SimilarityHit { id: "c1".to_string(), score: 0.8 },
			SimilarityHit { id: "c3".to_string(), score: 0.75 },
			SimilarityHit { id: "c2".to_string(), score: 0.6 },
		];
		let results = service.aggregate_similar(&hits).await.unwrap();

		// Synthesized threads follow bucket-population order, each emitted
		// exactly once with all of its matched children.
		assert_eq!(results.len(), 2);
		assert_eq!(results[0].id, "t1");
		assert_eq!(results[0].similarity_score, 0.42);
		assert_eq!(results[0].similar_messages.len(), 2);
		assert_eq!(results[0].similar_messages[0].id, "c1");
		assert_eq!(results[1].id, "t2");
		assert_eq!(results[1].similarity_score, 0.3);
		assert_eq!(results[1].similar_messages.len(), 1);
	}

	#[tokio::test]
	async fn child_hits_merge_into_a_directly_matched_thread() {
		let provider = FakeProvider::new();
		let relational = FakeRelational {
			similarities: HashMap::from([(("t1".to_string(), "c1".to_string()), 0.42)]),
			..Default::default()
		};
		let documents =
			FakeDocuments { documents: vec![thread("t1", "Intro", "hello"), reply("c1", "t1")] };
		let service = service(relational, documents, &provider);
		let hits = vec![
			SimilarityHit { id: "t1".to_string(), score: 0.9 },
			SimilarityHit { id: "c1".to_string(), score: 0.8 },
		];
		let results = service.aggregate_similar(&hits).await.unwrap();

		assert_eq!(results.len(), 1);
		assert_eq!(results[0].id, "t1");
		assert_eq!(results[0].similarity_score, 0.42);
		assert_eq!(results[0].similar_messages.len(), 1);
		assert_eq!(results[0].similar_messages[0].id, "c1");
		assert_eq!(results[0].similar_messages[0].similarity_score, 0.8);
	}

	#[tokio::test]
	async fn standalone_threads_serialize_without_similar_messages() {
		let provider = FakeProvider::new();
		let documents = FakeDocuments { documents: vec![thread("t1", "Intro", "hello")] };
		let service = service(FakeRelational::default(), documents, &provider);
		let hits = vec![SimilarityHit { id: "t1".to_string(), score: 0.9 }];
		let results = service.aggregate_similar(&hits).await.unwrap();
		let json = serde_json::to_value(&results[0]).unwrap();

		assert!(json.get("similar_messages").is_none());
	}
}
