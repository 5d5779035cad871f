//! Sequential bulk-query engine.
//!
//! A campaign is drained one record per tick: take the first record still
//! `pendente`, issue a single POST, classify the response and store the
//! outcome. The loop state lives on the campaign row, so pause/resume/stop
//! issued from another process take effect at the next tick boundary and a
//! resumed campaign continues exactly where it left off.
use crate::db;
use crate::model::{EstadoCampanha, ResumoCampanha};
use crate::webhook::model::classificar;
use crate::webhook::ConsultaApi;
use anyhow::Result;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Process the next pending record of a campaign.
///
/// Returns `true` when a record was consulted. Returns `false` when the
/// campaign is not `running` or has no pending records left; in the latter
/// case the campaign is marked completed.
#[instrument(skip_all)]
pub async fn processar_proxima(
    pool: &SqlitePool,
    api: &dyn ConsultaApi,
    campanha_id: i64,
) -> Result<bool> {
    if db::estado_campanha(pool, campanha_id).await? != EstadoCampanha::Running {
        return Ok(false);
    }

    let Some((consulta_id, cpf)) = db::proxima_pendente(pool, campanha_id).await? else {
        db::concluir_campanha(pool, campanha_id).await?;
        let resumo = db::resumo_campanha(pool, campanha_id).await?;
        info!(
            campanha_id,
            total = resumo.total,
            com_saldo = resumo.com_saldo,
            sem_saldo = resumo.sem_saldo,
            erros = resumo.erros,
            "campaign completed"
        );
        return Ok(false);
    };

    db::marcar_processando(pool, consulta_id).await?;
    match api.consultar_cpf(&cpf).await {
        Ok(resposta) => {
            let desfecho = classificar(resposta);
            db::registrar_desfecho(pool, consulta_id, &desfecho).await?;
            info!(
                consulta_id,
                cpf,
                status = desfecho.status.as_str(),
                "record consulted"
            );
        }
        Err(err) => {
            // One failure marks one record; the loop itself never aborts.
            warn!(?err, consulta_id, cpf, "consultation failed");
            db::registrar_falha(pool, consulta_id, &err.to_string()).await?;
        }
    }
    Ok(true)
}

/// Run a campaign in the foreground until it reaches `idle`, either by
/// natural completion or by a `parar` issued elsewhere. While paused the
/// loop keeps polling so a `retomar` from another terminal is picked up.
pub async fn executar_campanha(
    pool: &SqlitePool,
    api: &dyn ConsultaApi,
    campanha_id: i64,
    tick: Duration,
) -> Result<ResumoCampanha> {
    loop {
        match db::estado_campanha(pool, campanha_id).await? {
            EstadoCampanha::Running => {
                let consumido = processar_proxima(pool, api, campanha_id).await?;
                if !consumido {
                    // Completion transitions to idle inside the tick.
                    if db::estado_campanha(pool, campanha_id).await? == EstadoCampanha::Idle {
                        break;
                    }
                }
            }
            EstadoCampanha::Paused => {}
            EstadoCampanha::Idle => break,
        }
        tokio::time::sleep(tick).await;
    }
    db::resumo_campanha(pool, campanha_id).await
}

/// One daemon tick: advance the first running campaign that still has work.
/// Returns `true` when a record was consulted somewhere.
pub async fn processar_alguma(pool: &SqlitePool, api: &dyn ConsultaApi) -> Result<bool> {
    for campanha in db::listar_campanhas(pool).await? {
        if campanha.estado != EstadoCampanha::Running {
            continue;
        }
        if processar_proxima(pool, api, campanha.id).await? {
            return Ok(true);
        }
    }
    Ok(false)
}
