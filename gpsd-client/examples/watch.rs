use gpsd_client::{Gpsd, Report};

#[tokio::main]
async fn main() {
    let mut session = Gpsd::connect("localhost:2947").await.unwrap();
    println!("version: {:#?}", session.version);

    loop {
        match session.next_report().await.unwrap() {
            Report::Tpv(tpv) => println!(
                "{} lat: {:?} lon: {:?} time: {:?}",
                tpv.mode, tpv.lat, tpv.lon, tpv.time
            ),
            report => println!("{:?}", report),
        }
    }
}
