//! Prints the custom resource definitions managed by the operator as a
//! multi-document YAML stream, ready for `kubectl apply -f -`.

use kube::CustomResourceExt;

use uptimerobot_operator::crds::{
    AlertContact, MaintenanceWindow, PublicStatusPage, UptimeRobotMonitor,
};

fn main() -> anyhow::Result<()> {
    for crd in [
        UptimeRobotMonitor::crd(),
        AlertContact::crd(),
        MaintenanceWindow::crd(),
        PublicStatusPage::crd(),
    ] {
        println!("---");
        print!("{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
