use super::model::{Campanha, ConsultaRow, PropostaRow};
use crate::importer::RegistroImportado;
use crate::model::{
    Ambiente, Credenciais, EstadoCampanha, ResumoCampanha, StatusConsulta, StatusProposta, Token,
};
use crate::propostas::PropostaValidada;
use crate::webhook::model::Desfecho;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;").execute(&pool).await?;
    sqlx::query("PRAGMA synchronous=FULL;").execute(&pool).await?;
    Ok(pool)
}

/// Normalize a file-backed SQLite URL: expand a leading `~/` and make sure
/// the parent directory exists. In-memory URLs and non-sqlite schemes pass
/// through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }

    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }

    let path = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    match query {
        Some(q) => format!("sqlite://{path}?{q}"),
        None => format!("sqlite://{path}"),
    }
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Campaigns
// ---------------------------------------------------------------------------

#[instrument(skip_all)]
pub async fn criar_campanha(pool: &Pool, nome: &str, arquivo_nome: Option<&str>) -> Result<i64> {
    let rec = sqlx::query(
        "INSERT INTO campanhas (nome, arquivo_nome, estado) VALUES (?, ?, 'idle') RETURNING id",
    )
    .bind(nome)
    .bind(arquivo_nome)
    .fetch_one(pool)
    .await?;
    Ok(rec.get::<i64, _>("id"))
}

#[instrument(skip_all)]
pub async fn registrar_lote_remoto(
    pool: &Pool,
    campanha_id: i64,
    batch_id: &str,
    batch_status: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE campanhas SET batch_id = ?, batch_status = ? WHERE id = ?")
        .bind(batch_id)
        .bind(batch_status)
        .bind(campanha_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn carregar_campanha(pool: &Pool, campanha_id: i64) -> Result<Campanha> {
    let row = sqlx::query(
        "SELECT id, nome, arquivo_nome, batch_id, batch_status, estado, created_at, finalizada_em \
         FROM campanhas WHERE id = ?",
    )
    .bind(campanha_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Err(anyhow!("campaign {} not found", campanha_id));
    };
    campanha_from_row(&row)
}

pub async fn listar_campanhas(pool: &Pool) -> Result<Vec<Campanha>> {
    let rows = sqlx::query(
        "SELECT id, nome, arquivo_nome, batch_id, batch_status, estado, created_at, finalizada_em \
         FROM campanhas ORDER BY id DESC",
    )
    .fetch_all(pool)
    .await?;
    rows.iter().map(campanha_from_row).collect()
}

fn campanha_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Campanha> {
    let estado_str: String = row.get("estado");
    let estado = EstadoCampanha::parse(&estado_str)
        .ok_or_else(|| anyhow!("campaign has unknown state {}", estado_str))?;
    Ok(Campanha {
        id: row.get("id"),
        nome: row.get("nome"),
        arquivo_nome: row.try_get("arquivo_nome").ok(),
        batch_id: row.try_get("batch_id").ok().flatten(),
        batch_status: row.try_get("batch_status").ok().flatten(),
        estado,
        created_at: row.get("created_at"),
        finalizada_em: row.try_get("finalizada_em").ok().flatten(),
    })
}

pub async fn estado_campanha(pool: &Pool, campanha_id: i64) -> Result<EstadoCampanha> {
    let estado: Option<String> = sqlx::query_scalar("SELECT estado FROM campanhas WHERE id = ?")
        .bind(campanha_id)
        .fetch_optional(pool)
        .await?;
    let Some(estado) = estado else {
        return Err(anyhow!("campaign {} not found", campanha_id));
    };
    EstadoCampanha::parse(&estado).ok_or_else(|| anyhow!("campaign has unknown state {}", estado))
}

async fn transicao(
    pool: &Pool,
    campanha_id: i64,
    de: &[EstadoCampanha],
    para: EstadoCampanha,
    erro: &'static str,
) -> Result<()> {
    let estados: Vec<&str> = de.iter().map(EstadoCampanha::as_str).collect();
    // At most three states exist, so the IN list is built inline.
    let sql = format!(
        "UPDATE campanhas SET estado = ? WHERE id = ? AND estado IN ({})",
        estados.iter().map(|_| "?").collect::<Vec<_>>().join(", ")
    );
    let mut query = sqlx::query(&sql).bind(para.as_str()).bind(campanha_id);
    for estado in estados {
        query = query.bind(estado);
    }
    let result = query.execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(anyhow!("{} (campaign {})", erro, campanha_id));
    }
    Ok(())
}

/// `idle → running`. A stopped campaign can be started again; the tick loop
/// will pick up from the first record that is still pending.
#[instrument(skip_all)]
pub async fn iniciar_campanha(pool: &Pool, campanha_id: i64) -> Result<()> {
    transicao(
        pool,
        campanha_id,
        &[EstadoCampanha::Idle],
        EstadoCampanha::Running,
        "campaign is not idle",
    )
    .await
}

/// `running → paused`. Only future ticks are suppressed; a request already
/// in flight finishes and records its outcome.
#[instrument(skip_all)]
pub async fn pausar_campanha(pool: &Pool, campanha_id: i64) -> Result<()> {
    transicao(
        pool,
        campanha_id,
        &[EstadoCampanha::Running],
        EstadoCampanha::Paused,
        "campaign is not running",
    )
    .await
}

/// `paused → running`.
#[instrument(skip_all)]
pub async fn retomar_campanha(pool: &Pool, campanha_id: i64) -> Result<()> {
    transicao(
        pool,
        campanha_id,
        &[EstadoCampanha::Paused],
        EstadoCampanha::Running,
        "campaign is not paused",
    )
    .await
}

/// Any state → `idle`. Recorded outcomes are kept for export.
#[instrument(skip_all)]
pub async fn parar_campanha(pool: &Pool, campanha_id: i64) -> Result<()> {
    let result = sqlx::query("UPDATE campanhas SET estado = 'idle' WHERE id = ?")
        .bind(campanha_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(anyhow!("campaign {} not found", campanha_id));
    }
    Ok(())
}

/// Natural completion: back to `idle` with the finish timestamp stamped.
#[instrument(skip_all)]
pub async fn concluir_campanha(pool: &Pool, campanha_id: i64) -> Result<()> {
    sqlx::query("UPDATE campanhas SET estado = 'idle', finalizada_em = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(campanha_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Consultation records
// ---------------------------------------------------------------------------

#[instrument(skip_all)]
pub async fn inserir_registros(
    pool: &Pool,
    campanha_id: i64,
    registros: &[RegistroImportado],
) -> Result<u64> {
    let mut tx = pool.begin().await?;
    for registro in registros {
        inserir_registro_tx(&mut tx, campanha_id, registro).await?;
    }
    tx.commit().await?;
    Ok(registros.len() as u64)
}

async fn inserir_registro_tx(
    tx: &mut Transaction<'_, Sqlite>,
    campanha_id: i64,
    registro: &RegistroImportado,
) -> Result<i64> {
    let rec = sqlx::query(
        "INSERT INTO consultas (campanha_id, request_id, cpf, nome, telefone, status) \
         VALUES (?, ?, ?, ?, ?, 'pendente') RETURNING id",
    )
    .bind(campanha_id)
    .bind(&registro.request_id)
    .bind(&registro.cpf)
    .bind(&registro.nome)
    .bind(&registro.telefone)
    .fetch_one(&mut **tx)
    .await?;
    Ok(rec.get("id"))
}

/// The next record to consult: always the first `pendente` in insertion
/// order, so a paused-and-resumed campaign never reprocesses anything.
#[instrument(skip_all)]
pub async fn proxima_pendente(pool: &Pool, campanha_id: i64) -> Result<Option<(i64, String)>> {
    let row = sqlx::query(
        "SELECT id, cpf FROM consultas \
         WHERE campanha_id = ? AND status = 'pendente' ORDER BY id ASC LIMIT 1",
    )
    .bind(campanha_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| (r.get("id"), r.get("cpf"))))
}

#[instrument(skip_all)]
pub async fn marcar_processando(pool: &Pool, consulta_id: i64) -> Result<()> {
    sqlx::query("UPDATE consultas SET status = 'processando', atualizada_em = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(consulta_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Store a classified outcome. The CSV-provided name wins over the one the
/// partner echoes back.
#[instrument(skip_all)]
pub async fn registrar_desfecho(pool: &Pool, consulta_id: i64, desfecho: &Desfecho) -> Result<()> {
    sqlx::query(
        "UPDATE consultas SET status = ?, nome = COALESCE(nome, ?), valor_liberado = ?, \
         banco = ?, mensagem = ?, api_response = ?, atualizada_em = ? WHERE id = ?",
    )
    .bind(desfecho.status.as_str())
    .bind(&desfecho.nome)
    .bind(desfecho.valor_liberado)
    .bind(&desfecho.banco)
    .bind(&desfecho.mensagem)
    .bind(desfecho.bruto.to_string())
    .bind(Utc::now())
    .bind(consulta_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// A transport-level failure marks only this record as `erro`, with the
/// exception message captured as the log.
#[instrument(skip_all)]
pub async fn registrar_falha(pool: &Pool, consulta_id: i64, log: &str) -> Result<()> {
    sqlx::query("UPDATE consultas SET status = 'erro', log = ?, atualizada_em = ? WHERE id = ?")
        .bind(log)
        .bind(Utc::now())
        .bind(consulta_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn resumo_campanha(pool: &Pool, campanha_id: i64) -> Result<ResumoCampanha> {
    let rows = sqlx::query(
        "SELECT status, COUNT(*) AS quantos FROM consultas WHERE campanha_id = ? GROUP BY status",
    )
    .bind(campanha_id)
    .fetch_all(pool)
    .await?;

    let mut resumo = ResumoCampanha::default();
    for row in rows {
        let status: String = row.get("status");
        let quantos: i64 = row.get("quantos");
        resumo.total += quantos;
        match StatusConsulta::parse(&status) {
            Some(StatusConsulta::ComSaldo) => resumo.com_saldo += quantos,
            Some(StatusConsulta::SemSaldo) => resumo.sem_saldo += quantos,
            Some(StatusConsulta::Erro) => resumo.erros += quantos,
            // A record caught mid-flight still counts as pending work.
            Some(StatusConsulta::Pendente) | Some(StatusConsulta::Processando) | None => {
                resumo.pendentes += quantos
            }
        }
    }
    Ok(resumo)
}

pub async fn registros_campanha(pool: &Pool, campanha_id: i64) -> Result<Vec<ConsultaRow>> {
    let rows = sqlx::query(
        "SELECT id, campanha_id, request_id, cpf, nome, telefone, status, valor_liberado, \
         banco, mensagem, log, api_response, created_at \
         FROM consultas WHERE campanha_id = ? ORDER BY id ASC",
    )
    .bind(campanha_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(consulta_from_row).collect()
}

/// Record an individual (non-campaign) query into the local history.
#[instrument(skip_all)]
pub async fn inserir_consulta_avulsa(
    pool: &Pool,
    request_id: &str,
    cpf: &str,
    desfecho: &Desfecho,
) -> Result<i64> {
    let rec = sqlx::query(
        "INSERT INTO consultas (campanha_id, request_id, cpf, nome, status, valor_liberado, \
         banco, mensagem, api_response, atualizada_em) \
         VALUES (NULL, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(request_id)
    .bind(cpf)
    .bind(&desfecho.nome)
    .bind(desfecho.status.as_str())
    .bind(desfecho.valor_liberado)
    .bind(&desfecho.banco)
    .bind(&desfecho.mensagem)
    .bind(desfecho.bruto.to_string())
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(rec.get("id"))
}

/// The whole local history, newest first. Filtering happens in memory, the
/// same way the dashboard filtered the fetched list.
pub async fn listar_historico(pool: &Pool) -> Result<Vec<ConsultaRow>> {
    let rows = sqlx::query(
        "SELECT id, campanha_id, request_id, cpf, nome, telefone, status, valor_liberado, \
         banco, mensagem, log, api_response, created_at \
         FROM consultas ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await?;
    rows.iter().map(consulta_from_row).collect()
}

fn consulta_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ConsultaRow> {
    let status_str: String = row.get("status");
    let status = StatusConsulta::parse(&status_str)
        .ok_or_else(|| anyhow!("consultation has unknown status {}", status_str))?;
    Ok(ConsultaRow {
        id: row.get("id"),
        campanha_id: row.try_get("campanha_id").ok().flatten(),
        request_id: row.get("request_id"),
        cpf: row.get("cpf"),
        nome: row.try_get("nome").ok().flatten(),
        telefone: row.try_get("telefone").ok().flatten(),
        status,
        valor_liberado: row.try_get("valor_liberado").ok().flatten(),
        banco: row.try_get("banco").ok().flatten(),
        mensagem: row.try_get("mensagem").ok().flatten(),
        log: row.try_get("log").ok().flatten(),
        api_response: row.try_get("api_response").ok().flatten(),
        created_at: row.get("created_at"),
    })
}

// ---------------------------------------------------------------------------
// Proposals
// ---------------------------------------------------------------------------

#[instrument(skip_all)]
pub async fn inserir_proposta(pool: &Pool, proposta: &PropostaValidada) -> Result<i64> {
    let rec = sqlx::query(
        "INSERT INTO propostas (cliente, cpf, banco, valor, prazo, taxa, data_nascimento, \
         telefone, observacoes, status, data_envio) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'pendente', ?) RETURNING id",
    )
    .bind(&proposta.cliente)
    .bind(&proposta.cpf)
    .bind(&proposta.banco)
    .bind(proposta.valor)
    .bind(proposta.prazo)
    .bind(proposta.taxa)
    .bind(&proposta.data_nascimento)
    .bind(&proposta.telefone)
    .bind(&proposta.observacoes)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(rec.get("id"))
}

pub async fn listar_propostas(pool: &Pool) -> Result<Vec<PropostaRow>> {
    let rows = sqlx::query(
        "SELECT id, cliente, cpf, banco, valor, prazo, taxa, data_nascimento, telefone, \
         observacoes, status, data_envio, data_situacao \
         FROM propostas ORDER BY data_envio DESC, id DESC",
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let status_str: String = row.get("status");
            let status = StatusProposta::parse(&status_str)
                .ok_or_else(|| anyhow!("proposal has unknown status {}", status_str))?;
            Ok(PropostaRow {
                id: row.get("id"),
                cliente: row.get("cliente"),
                cpf: row.get("cpf"),
                banco: row.get("banco"),
                valor: row.get("valor"),
                prazo: row.try_get("prazo").ok().flatten(),
                taxa: row.try_get("taxa").ok().flatten(),
                data_nascimento: row.get("data_nascimento"),
                telefone: row.try_get("telefone").ok().flatten(),
                observacoes: row.try_get("observacoes").ok().flatten(),
                status,
                data_envio: row.get("data_envio"),
                data_situacao: row.try_get("data_situacao").ok().flatten(),
            })
        })
        .collect()
}

#[instrument(skip_all)]
pub async fn atualizar_situacao_proposta(
    pool: &Pool,
    proposta_id: i64,
    status: StatusProposta,
) -> Result<()> {
    let result = sqlx::query("UPDATE propostas SET status = ?, data_situacao = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(proposta_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(anyhow!("proposal {} not found", proposta_id));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Facta credentials & token
// ---------------------------------------------------------------------------

#[instrument(skip_all)]
pub async fn salvar_credenciais(pool: &Pool, credenciais: &Credenciais) -> Result<()> {
    sqlx::query(
        "INSERT INTO facta_credenciais (id, usuario, senha, ambiente, atualizada_em) \
         VALUES (1, ?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET usuario = excluded.usuario, senha = excluded.senha, \
         ambiente = excluded.ambiente, atualizada_em = excluded.atualizada_em",
    )
    .bind(&credenciais.usuario)
    .bind(&credenciais.senha)
    .bind(credenciais.ambiente.as_str())
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn carregar_credenciais(pool: &Pool) -> Result<Option<Credenciais>> {
    let row = sqlx::query("SELECT usuario, senha, ambiente FROM facta_credenciais WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let ambiente_str: String = row.get("ambiente");
    let ambiente = Ambiente::parse(&ambiente_str)
        .ok_or_else(|| anyhow!("stored credentials have unknown environment {}", ambiente_str))?;
    Ok(Some(Credenciais {
        usuario: row.get("usuario"),
        senha: row.get("senha"),
        ambiente,
    }))
}

#[instrument(skip_all)]
pub async fn salvar_token(pool: &Pool, token: &Token) -> Result<()> {
    sqlx::query(
        "INSERT INTO facta_token (id, token, expira_em, gerado_em) VALUES (1, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET token = excluded.token, expira_em = excluded.expira_em, \
         gerado_em = excluded.gerado_em",
    )
    .bind(&token.token)
    .bind(token.expira_em)
    .bind(token.gerado_em)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load the stored token if it is still valid at `agora`; an expired token is
/// purged, mirroring the dashboard's expiry countdown behavior.
pub async fn carregar_token_valido(pool: &Pool, agora: DateTime<Utc>) -> Result<Option<Token>> {
    let row = sqlx::query("SELECT token, expira_em, gerado_em FROM facta_token WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let token = Token {
        token: row.get("token"),
        expira_em: row.get("expira_em"),
        gerado_em: row.get("gerado_em"),
    };
    if token.expira_em <= agora {
        sqlx::query("DELETE FROM facta_token WHERE id = 1")
            .execute(pool)
            .await?;
        return Ok(None);
    }
    Ok(Some(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StatusConsulta;
    use serde_json::json;

    async fn setup_pool() -> Pool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn registros(cpfs: &[&str]) -> Vec<RegistroImportado> {
        cpfs.iter()
            .enumerate()
            .map(|(i, cpf)| RegistroImportado {
                request_id: format!("REQ-{i}"),
                cpf: cpf.to_string(),
                nome: None,
                telefone: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn transicoes_de_estado() {
        let pool = setup_pool().await;
        let id = criar_campanha(&pool, "Campanha Teste", Some("teste.csv"))
            .await
            .unwrap();
        assert_eq!(estado_campanha(&pool, id).await.unwrap(), EstadoCampanha::Idle);

        iniciar_campanha(&pool, id).await.unwrap();
        assert_eq!(
            estado_campanha(&pool, id).await.unwrap(),
            EstadoCampanha::Running
        );
        // Starting twice is rejected.
        assert!(iniciar_campanha(&pool, id).await.is_err());

        pausar_campanha(&pool, id).await.unwrap();
        assert!(pausar_campanha(&pool, id).await.is_err());
        retomar_campanha(&pool, id).await.unwrap();

        parar_campanha(&pool, id).await.unwrap();
        assert_eq!(estado_campanha(&pool, id).await.unwrap(), EstadoCampanha::Idle);
        // A stopped campaign can start again.
        iniciar_campanha(&pool, id).await.unwrap();
    }

    #[tokio::test]
    async fn proxima_pendente_avanca_em_ordem() {
        let pool = setup_pool().await;
        let id = criar_campanha(&pool, "Ordem", None).await.unwrap();
        inserir_registros(&pool, id, &registros(&["111", "222", "333"]))
            .await
            .unwrap();

        let (c1, cpf1) = proxima_pendente(&pool, id).await.unwrap().unwrap();
        assert_eq!(cpf1, "111");
        registrar_falha(&pool, c1, "timeout").await.unwrap();

        let (c2, cpf2) = proxima_pendente(&pool, id).await.unwrap().unwrap();
        assert_eq!(cpf2, "222");
        marcar_processando(&pool, c2).await.unwrap();

        // A record in flight is no longer pending.
        let (_, cpf3) = proxima_pendente(&pool, id).await.unwrap().unwrap();
        assert_eq!(cpf3, "333");
    }

    #[tokio::test]
    async fn resumo_conta_por_status() {
        let pool = setup_pool().await;
        let id = criar_campanha(&pool, "Resumo", None).await.unwrap();
        inserir_registros(&pool, id, &registros(&["111", "222", "333"]))
            .await
            .unwrap();

        let (c1, _) = proxima_pendente(&pool, id).await.unwrap().unwrap();
        let desfecho = crate::webhook::model::classificar(json!({"codigo": "SIM", "banco": "FACTA"}));
        registrar_desfecho(&pool, c1, &desfecho).await.unwrap();

        let resumo = resumo_campanha(&pool, id).await.unwrap();
        assert_eq!(resumo.total, 3);
        assert_eq!(resumo.com_saldo, 1);
        assert_eq!(resumo.pendentes, 2);
        assert_eq!(resumo.processados(), 1);
    }

    #[tokio::test]
    async fn historico_inclui_consultas_avulsas() {
        let pool = setup_pool().await;
        let desfecho = crate::webhook::model::classificar(json!({"codigo": "NAO"}));
        inserir_consulta_avulsa(&pool, "REQ-AVULSA", "12345678900", &desfecho)
            .await
            .unwrap();

        let historico = listar_historico(&pool).await.unwrap();
        assert_eq!(historico.len(), 1);
        assert_eq!(historico[0].cpf, "12345678900");
        assert_eq!(historico[0].status, StatusConsulta::SemSaldo);
        assert!(historico[0].campanha_id.is_none());
    }

    #[tokio::test]
    async fn credenciais_e_token() {
        let pool = setup_pool().await;
        assert!(carregar_credenciais(&pool).await.unwrap().is_none());

        let credenciais = Credenciais {
            usuario: "operador".into(),
            senha: "segredo".into(),
            ambiente: Ambiente::Homologacao,
        };
        salvar_credenciais(&pool, &credenciais).await.unwrap();
        assert_eq!(carregar_credenciais(&pool).await.unwrap(), Some(credenciais.clone()));

        // Upsert keeps a single row.
        let producao = Credenciais {
            ambiente: Ambiente::Producao,
            ..credenciais
        };
        salvar_credenciais(&pool, &producao).await.unwrap();
        let carregadas = carregar_credenciais(&pool).await.unwrap().unwrap();
        assert_eq!(carregadas.ambiente, Ambiente::Producao);

        let agora = Utc::now();
        let token = Token {
            token: "abc".into(),
            expira_em: agora + chrono::Duration::hours(1),
            gerado_em: agora,
        };
        salvar_token(&pool, &token).await.unwrap();
        assert!(carregar_token_valido(&pool, agora).await.unwrap().is_some());
        // Past expiry the token is purged.
        let depois = agora + chrono::Duration::hours(2);
        assert!(carregar_token_valido(&pool, depois).await.unwrap().is_none());
        assert!(carregar_token_valido(&pool, agora).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn propostas_ciclo_de_vida() {
        let pool = setup_pool().await;
        let proposta = PropostaValidada {
            cliente: "Maria Silva".into(),
            cpf: "12345678900".into(),
            banco: "FACTA".into(),
            valor: 5000.0,
            prazo: Some(12),
            taxa: Some(1.8),
            data_nascimento: "1990-03-15".into(),
            telefone: Some("11987654321".into()),
            observacoes: None,
        };
        let id = inserir_proposta(&pool, &proposta).await.unwrap();

        let listadas = listar_propostas(&pool).await.unwrap();
        assert_eq!(listadas.len(), 1);
        assert_eq!(listadas[0].status, StatusProposta::Pendente);
        assert!(listadas[0].data_situacao.is_none());

        atualizar_situacao_proposta(&pool, id, StatusProposta::Aprovada)
            .await
            .unwrap();
        let listadas = listar_propostas(&pool).await.unwrap();
        assert_eq!(listadas[0].status, StatusProposta::Aprovada);
        assert!(listadas[0].data_situacao.is_some());

        assert!(
            atualizar_situacao_proposta(&pool, 999, StatusProposta::Negada)
                .await
                .is_err()
        );
    }
}
