use std::{path::Path, sync::Arc, thread};

use docket::{
    Chunker,
    ContextAssembler,
    Corpus,
    Pipeline,
    chunking::ChunkType,
    config::{ChunkingConfig, PipelineConfig},
    extract::EntityKind,
    ingestion,
    pipeline::Completion,
    query::Intent,
    walker,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// `Madde {n} - ` followed by filler, exactly `len` characters long.
fn article(n: usize, len: usize) -> String {
    format!("Madde {n} - {}", "hüküm metni ".repeat(len))
        .chars()
        .take(len)
        .collect()
}

fn setup_fixture(dir: &Path) -> std::io::Result<()> {
    let laws = dir.join("kanunlar");
    std::fs::create_dir_all(&laws)?;
    std::fs::write(
        laws.join("is-kanunu.md"),
        "# 4857 sayılı İş Kanunu\n\n\
         Madde 17 - Belirsiz süreli iş sözleşmelerinin feshinden önce \
         durumun diğer tarafa bildirilmesi gerekir.\n\n\
         Madde 18 - Otuz veya daha fazla işçi çalıştıran işyerlerinde \
         işçinin sözleşmesini fesheden işveren, geçerli bir sebebe \
         dayanmak zorundadır.\n",
    )?;
    std::fs::write(
        laws.join("borclar.md"),
        "# Türk Borçlar Kanunu\n\n\
         Madde 299 - Kira sözleşmesi, kiraya verenin bir şeyin \
         kullanılmasını kiracıya bırakmayı üstlendiği sözleşmedir.\n",
    )?;

    let decisions = dir.join("kararlar");
    std::fs::create_dir_all(&decisions)?;
    std::fs::write(
        decisions.join("yargitay.txt"),
        "Yargıtay 9. Hukuk Dairesi 2019/1234 E. 2020/567 K. sayılı \
         kararında, 4857 sayılı İş Kanunu madde 18 uyarınca feshin \
         geçerli sebebe dayanmadığına hükmetmiştir.",
    )?;
    Ok(())
}

fn load_corpus(dir: &Path, config: &PipelineConfig) -> docket::Result<Corpus> {
    let files = walker::discover_files(dir)?;
    let documents = ingestion::load_documents(&files);
    let chunker = Chunker::new(config.chunking.clone())?;
    Ok(Corpus::from_chunks(ingestion::chunk_documents(
        &chunker, &documents,
    )))
}

#[test]
fn two_articles_make_two_chunks() -> TestResult {
    let text = format!("{}\n\n{}", article(1, 1490), article(2, 1490));
    assert_eq!(text.chars().count(), 2982);

    let chunker = Chunker::new(ChunkingConfig::with_sizes(100, 1500, 0))?;
    let chunks = chunker.chunk(&text, "doc", "Kanun");

    assert_eq!(chunks.len(), 2);
    assert!(
        chunks
            .iter()
            .all(|c| c.metadata.chunk_type == ChunkType::Article)
    );
    assert!(chunks[0].content.starts_with("Madde 1 "));
    assert!(chunks[1].content.starts_with("Madde 2 "));
    assert_eq!(chunks[0].metadata.section, "Madde 1");
    assert_eq!(chunks[1].metadata.section, "Madde 2");
    assert!(chunks.iter().all(|c| c.metadata.total_chunks == 2));
    Ok(())
}

#[test]
fn empty_query_scenario() -> TestResult {
    let analysis = Pipeline::new(&PipelineConfig::default())?
        .analyzer()
        .analyze("");

    assert!(analysis.keywords.is_empty());
    assert_eq!(analysis.intent, Intent::General);
    assert!(analysis.entities.is_empty());
    assert_eq!(analysis.expanded_queries, vec![String::new()]);
    Ok(())
}

#[test]
fn law_lookup_takes_precedence() -> TestResult {
    let analysis = Pipeline::new(&PipelineConfig::default())?
        .analyzer()
        .analyze("4857 sayılı İş Kanunu madde 17 nedir");

    assert_eq!(analysis.intent, Intent::FindLaw);
    let has = |kind: EntityKind, value: &str| {
        analysis
            .entities
            .iter()
            .any(|e| e.kind == kind && e.value == value)
    };
    assert!(has(EntityKind::LawCitation, "4857 sayılı İş Kanunu"));
    assert!(has(EntityKind::Article, "madde 17"));
    Ok(())
}

#[test]
fn empty_assembly() {
    let assembler = ContextAssembler::default();
    assert_eq!(assembler.assemble(&[], 4_000), "");
    assert_eq!(assembler.assemble(&[], 0), "");
}

#[test]
fn end_to_end_over_directory() -> TestResult {
    let tmp = tempfile::tempdir()?;
    setup_fixture(tmp.path())?;

    let config = PipelineConfig::default();
    let corpus = load_corpus(tmp.path(), &config)?;
    assert_eq!(corpus.document_count(), 3);

    let pipeline = Pipeline::new(&config)?;
    let response =
        pipeline.query(&corpus, "4857 sayılı İş Kanunu madde 18 nedir", 2_000);

    assert_eq!(response.completion, Completion::Finished);
    assert_eq!(response.analysis.intent, Intent::FindLaw);
    assert!(!response.results.is_empty());

    let scores: Vec<f64> = response.results.iter().map(|r| r.score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert!(scores.iter().all(|s| *s > 0.0 && *s <= 1.0));

    assert!(response.results[0].chunk.content.contains("4857 sayılı"));
    assert!(response.context.contains("Madde 18"));
    Ok(())
}

#[test]
fn case_search_prefers_decisions() -> TestResult {
    let tmp = tempfile::tempdir()?;
    setup_fixture(tmp.path())?;

    let config = PipelineConfig::default();
    let corpus = load_corpus(tmp.path(), &config)?;
    let response = Pipeline::new(&config)?.query(
        &corpus,
        "Yargıtay geçerli sebep kararları",
        2_000,
    );

    assert_eq!(response.analysis.intent, Intent::FindCase);
    let top = &response.results[0].chunk;
    assert_eq!(top.metadata.chunk_type, ChunkType::Citation);
    assert!(top.content.starts_with("Yargıtay 9. Hukuk Dairesi"));
    Ok(())
}

#[test]
fn include_filter_limits_corpus() -> TestResult {
    let tmp = tempfile::tempdir()?;
    setup_fixture(tmp.path())?;

    let matcher = walker::include_matcher("kararlar/**")?;
    let files = walker::discover_matching(tmp.path(), Some(&matcher))?;
    assert_eq!(files.len(), 1);

    let documents = ingestion::load_documents(&files);
    let chunker = Chunker::new(ChunkingConfig::default())?;
    let corpus =
        Corpus::from_chunks(ingestion::chunk_documents(&chunker, &documents));

    let response = Pipeline::new(&PipelineConfig::default())?.query(
        &corpus,
        "kira sözleşmesi",
        2_000,
    );
    assert!(response.results.is_empty());
    assert_eq!(response.completion, Completion::Finished);
    assert_eq!(response.context, "");
    Ok(())
}

#[test]
fn queries_see_whole_updates_only() -> TestResult {
    let chunker = Chunker::new(ChunkingConfig::with_sizes(10, 60, 0))?;
    let pipeline = Pipeline::new(&PipelineConfig::default())?;
    let corpus = Arc::new(Corpus::new());

    let documents: Vec<_> = (0..20)
        .map(|i| {
            let text = format!(
                "Madde {i} - tahliye davası birinci bölüm.\n\n\
                 Madde {i}/2 - tahliye davası ikinci bölüm."
            );
            chunker.chunk(&text, &format!("doc{i}"), "Kira Kanunu")
        })
        .collect();
    let per_document = documents[0].len();
    assert_eq!(per_document, 2);
    assert!(documents.iter().all(|d| d.len() == per_document));

    thread::scope(|scope| {
        let writer = Arc::clone(&corpus);
        scope.spawn(move || {
            for chunks in documents {
                writer.add_document(chunks);
            }
        });

        for _ in 0..50 {
            let snapshot = corpus.snapshot();
            assert_eq!(snapshot.len() % per_document, 0);

            let response = pipeline.run(&snapshot, "tahliye", 10_000);
            assert!(response.results.len() <= snapshot.len());
        }
    });

    assert_eq!(corpus.document_count(), 20);
    Ok(())
}
