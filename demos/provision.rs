use std::time::Duration;
use tejun::prelude::*;

fn provision_plan() -> Result<Plan, PlanError> {
    let mut plan = Plan::new([PlanOption::limit_duration(Duration::from_secs(5))])?;

    plan.add_step(
        FnStep::named("reserve-ip")
            .on_exec(|ctx| async move {
                println!("Reserving address...");
                ctx.state().store("ip", "10.0.0.7".to_string());
                Ok(())
            })
            .on_cleanup(|ctx| async move {
                if let Some(ip) = ctx.state().get::<String>("ip") {
                    println!("Releasing address {}", ip);
                }
            }),
    )
    .add_step(
        FnStep::named("create-volume")
            .on_pre_exec(|ctx| async move {
                match ctx.state().get::<String>("ip") {
                    Some(_) => Ok(()),
                    None => Err(BoxError::from("no address reserved")),
                }
            })
            .on_exec(|ctx| async move {
                println!("Creating volume...");
                ctx.state().store("volume", "vol-42".to_string());
                Ok(())
            })
            .on_cleanup(|ctx| async move {
                if let Some(volume) = ctx.state().get::<String>("volume") {
                    println!("Deleting volume {}", volume);
                }
            }),
    )
    .add_delay(Duration::from_millis(200))
    .add_step(
        FnStep::named("attach-volume").on_exec(|_ctx| async {
            println!("Attaching volume...");
            Err(BoxError::from("attachment limit reached"))
        }),
    );

    Ok(plan)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let plan = provision_plan()?;

    match plan.execute(&CancellationToken::new()).await {
        Ok(()) => println!("Provisioning completed"),
        Err(PlanError::Cancelled) => println!("Provisioning cancelled"),
        Err(PlanError::Timeout) => println!("Provisioning timed out"),
        Err(err) => println!("Provisioning failed and was rolled back: {}", err),
    }

    println!("Final state: {:?}", plan.state());
    Ok(())
}
