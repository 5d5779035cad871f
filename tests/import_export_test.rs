use consulta_fgts::db;
use consulta_fgts::export;
use consulta_fgts::importer::{self, ImportError};
use consulta_fgts::model::StatusConsulta;
use std::io::Write;

async fn setup_pool() -> sqlx::SqlitePool {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

#[tokio::test]
async fn importacao_cria_registros_pendentes() {
    let pool = setup_pool().await;

    let report = importer::importar_texto(
        "CPF,nome,telefone\n\"123.456.789-00\",\"Jane\",\"11987654321\"\n\"1\",\"John\",\"\"\n",
    )
    .unwrap();
    assert_eq!(report.registros.len(), 2);
    assert_eq!(report.registros[0].cpf, "12345678900");
    assert_eq!(report.registros[1].cpf, "00000000001");

    let id = db::criar_campanha(&pool, "Importada", Some("lista.csv"))
        .await
        .unwrap();
    db::inserir_registros(&pool, id, &report.registros)
        .await
        .unwrap();

    let registros = db::registros_campanha(&pool, id).await.unwrap();
    assert_eq!(registros.len(), 2);
    assert!(registros
        .iter()
        .all(|r| r.status == StatusConsulta::Pendente));
    assert_eq!(registros[0].telefone.as_deref(), Some("11987654321"));
}

#[tokio::test]
async fn exportacao_reimporta_os_mesmos_cpfs() {
    let pool = setup_pool().await;

    let original = "CPF,nome\n12345678900,Jane\n00000000001,John\n98765432100,Ana\n";
    let report = importer::importar_texto(original).unwrap();
    let id = db::criar_campanha(&pool, "Ida e volta", None).await.unwrap();
    db::inserir_registros(&pool, id, &report.registros)
        .await
        .unwrap();

    let registros = db::registros_campanha(&pool, id).await.unwrap();
    let mut saida = Vec::new();
    export::exportar_campanha(&mut saida, &registros).unwrap();
    let texto = String::from_utf8(saida).unwrap();

    // Header plus one line per record.
    assert_eq!(texto.lines().count(), registros.len() + 1);

    // Re-importing the exported file recovers the same 11-digit identifiers.
    let reimportado = importer::importar_texto(&texto).unwrap();
    let cpfs: Vec<&str> = reimportado.registros.iter().map(|r| r.cpf.as_str()).collect();
    assert_eq!(cpfs, vec!["12345678900", "00000000001", "98765432100"]);
}

#[test]
fn arquivo_em_disco_passa_pelas_mesmas_validacoes() {
    let dir = tempfile::tempdir().unwrap();

    let valido = dir.path().join("clientes.csv");
    let mut f = std::fs::File::create(&valido).unwrap();
    writeln!(f, "CPF_CLIENTE,CLIENTE_NOME").unwrap();
    writeln!(f, "123.456.789-00,Jane").unwrap();
    let report = importer::importar_arquivo(&valido).unwrap();
    assert_eq!(report.registros[0].cpf, "12345678900");
    assert_eq!(report.registros[0].nome.as_deref(), Some("Jane"));

    let sem_cpf = dir.path().join("sem_cpf.csv");
    std::fs::write(&sem_cpf, "nome\nJane\n").unwrap();
    assert!(matches!(
        importer::importar_arquivo(&sem_cpf).unwrap_err(),
        ImportError::SemColunaCpf
    ));
}

#[test]
fn arquivo_acima_de_5mb_e_recusado() {
    let dir = tempfile::tempdir().unwrap();
    let grande = dir.path().join("grande.csv");
    let mut f = std::fs::File::create(&grande).unwrap();
    writeln!(f, "CPF").unwrap();
    let linha = "12345678900\n".repeat(500_000);
    f.write_all(linha.as_bytes()).unwrap();
    assert!(matches!(
        importer::importar_arquivo(&grande).unwrap_err(),
        ImportError::ArquivoGrande
    ));
}
