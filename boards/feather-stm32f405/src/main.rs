#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;

mod console;
mod results;
mod sdcard;
mod time;

use core::sync::atomic::AtomicBool;

stm32_tim2_monotonic!(Mono, 1_000_000);

/// Latched logger error, mirrored from the logger task for the status LED
static SD_ERROR: AtomicBool = AtomicBool::new(false);

/// Card maintenance requested with jumpers at reset
#[derive(Debug, Clone, Copy, defmt::Format)]
pub struct Maintenance {
    /// D5 to GND: stream all log files over RTT
    dump: bool,
    /// D6 to GND: delete all files on the card
    clear: bool,
}

#[app(device = embassy_stm32, peripherals = true, dispatchers = [USART1, USART2])]
mod app {
    use super::*;
    use core::cell::RefCell;
    use core::sync::atomic::Ordering;
    use defmt::{error, info, warn};
    use embassy_embedded_hal::shared_bus::blocking::spi::SpiDevice;
    use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
    use embassy_stm32::i2c::{self, I2c};
    use embassy_stm32::mode::Blocking;
    use embassy_stm32::rcc::{Hse, HseMode, LsConfig, LseConfig, LseMode};
    use embassy_stm32::rtc::{Rtc, RtcConfig};
    use embassy_stm32::spi::{self, Spi};
    use embassy_stm32::time::Hertz;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_sync::blocking_mutex::Mutex;
    use embassy_time::Delay;
    use embedded_io::Write as _;
    use embedded_sdmmc::SdCard;
    use fieldlog_core::storage::SdLogger;
    use fieldlog_core::{FieldTestConfig, LocalTimeConfig, LoggerConfig};
    use rtic_sync::channel::Receiver;
    use rtic_sync::make_channel;
    use static_cell::StaticCell;

    use console::RttConsole;
    use results::{LogRequest, QUEUE_LEN};
    use sdcard::SdVolume;
    use time::Clock;

    type SpiBus = Spi<'static, Blocking>;
    type SdSpi = SpiDevice<'static, CriticalSectionRawMutex, SpiBus, Output<'static>>;
    type Logger = SdLogger<SdVolume<SdCard<SdSpi, Delay>>, Output<'static>, Delay>;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        led: Output<'static>,
        logger: Logger,
        clock: Clock<I2c<'static, Blocking>>,
    }

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("Field logger starting...");

        // Adafruit Feather STM32F405: 12 MHz HSE, 32.768 kHz LSE (PC14/PC15)
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });

        // HSE (12 MHz) / PREDIV(6) = 2 MHz (PLL input)
        // 2 MHz * MUL(168) = 336 MHz (VCO)
        // VCO / DIVP(4) = 84 MHz (SYSCLK)
        // VCO / DIVQ(7) = 48 MHz (USB)
        config.rcc.pll_src = embassy_stm32::rcc::PllSource::HSE;
        config.rcc.pll = Some(embassy_stm32::rcc::Pll {
            prediv: embassy_stm32::rcc::PllPreDiv::DIV6,
            mul: embassy_stm32::rcc::PllMul::MUL168,
            divp: Some(embassy_stm32::rcc::PllPDiv::DIV4),
            divq: Some(embassy_stm32::rcc::PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.sys = embassy_stm32::rcc::Sysclk::PLL1_P;
        config.rcc.ahb_pre = embassy_stm32::rcc::AHBPrescaler::DIV1; // 84 MHz
        config.rcc.apb1_pre = embassy_stm32::rcc::APBPrescaler::DIV2; // 42 MHz
        config.rcc.apb2_pre = embassy_stm32::rcc::APBPrescaler::DIV1; // 84 MHz

        config.rcc.ls = LsConfig {
            rtc: embassy_stm32::rcc::RtcClockSource::LSE,
            lsi: false,
            lse: Some(LseConfig {
                frequency: Hertz(32_768),
                mode: LseMode::Oscillator(embassy_stm32::rcc::LseDrive::MediumHigh),
            }),
        };

        let p = embassy_stm32::init(config);

        // TIM2 on APB1: timer clock = 2*APB1 when prescaler != 1
        Mono::start(84_000_000);

        time::initialize_rtc(Rtc::new(p.RTC, RtcConfig::default()));

        let led = Output::new(p.PC1, Level::High, Speed::Low);

        // RV-3028 on the STEMMA QT connector (I2C1, SCL=PB6, SDA=PB7)
        let i2c = I2c::new_blocking(p.I2C1, p.PB6, p.PB7, i2c::Config::default());
        let clock = Clock::detect(i2c, LocalTimeConfig::default());
        if clock.is_external() {
            info!("Using RV-3028 for timestamps");
        }

        // microSD on the SPI header, CS=D10 (PB9), card power enable=D9 (PB8)
        let mut spi_config = spi::Config::default();
        spi_config.frequency = Hertz(400_000);
        let spi = Spi::new_blocking(p.SPI2, p.PB13, p.PB15, p.PB14, spi_config);

        static SPI_BUS: StaticCell<Mutex<CriticalSectionRawMutex, RefCell<SpiBus>>> =
            StaticCell::new();
        let bus = SPI_BUS.init(Mutex::new(RefCell::new(spi)));
        let cs = Output::new(p.PB9, Level::High, Speed::VeryHigh);
        let card = SdCard::new(SpiDevice::new(bus, cs), Delay);

        let power = Output::new(p.PB8, Level::Low, Speed::Low);
        let logger = SdLogger::new(
            SdVolume::new(card),
            power,
            Delay,
            FieldTestConfig::default(),
            LoggerConfig::default(),
        );

        let maintenance = {
            let dump = Input::new(p.PC7, Pull::Up);
            let clear = Input::new(p.PC6, Pull::Up);
            Maintenance {
                dump: dump.is_low(),
                clear: clear.is_low(),
            }
        };

        let (tx, rx) = make_channel!(LogRequest, QUEUE_LEN);
        results::install(tx);

        heartbeat::spawn().ok();
        log_task::spawn(rx, maintenance).ok();

        (Shared {}, Local { led, logger, clock })
    }

    /// Heartbeat task, blinks fast while the logger reports an error
    #[task(priority = 1, local = [led])]
    async fn heartbeat(cx: heartbeat::Context) {
        info!("Heartbeat task started");
        loop {
            let (on, off): (u32, u32) = if SD_ERROR.load(Ordering::Relaxed) {
                (100, 150)
            } else {
                (100, 4900)
            };
            cx.local.led.set_high();
            Mono::delay(on.millis()).await;
            cx.local.led.set_low();
            Mono::delay(off.millis()).await;
        }
    }

    /// Logger task - owns the card and the clock
    ///
    /// SD access is blocking, the card is only touched from here.
    #[task(priority = 1, local = [logger, clock])]
    async fn log_task(
        cx: log_task::Context,
        mut requests: Receiver<'static, LogRequest, QUEUE_LEN>,
        maintenance: Maintenance,
    ) {
        let logger = cx.local.logger;
        let clock = cx.local.clock;

        info!("Local time {}", clock.now());

        match logger.init() {
            Ok(()) => maintain(logger, maintenance),
            Err(e) => error!("SD card unavailable: {}", e),
        }
        if let Err(e) = logger.create_file() {
            warn!("No log file yet: {}", e);
        }
        SD_ERROR.store(logger.error(), Ordering::Relaxed);

        while let Ok(request) = requests.recv().await {
            match request {
                LogRequest::Row(result) => {
                    let result = result.stamped(&clock.now());
                    if let Err(e) = logger.write_entry(&result) {
                        warn!("Row not logged: {}", e);
                    }
                }
                LogRequest::Settings(field) => {
                    info!("Log settings changed: {}", field);
                    logger.set_field_config(field);
                    if let Err(e) = logger.create_file() {
                        warn!("New log file failed: {}", e);
                    }
                }
            }
            SD_ERROR.store(logger.error(), Ordering::Relaxed);
        }
        warn!("Log request channel closed");
    }

    fn maintain(logger: &mut Logger, maintenance: Maintenance) {
        let mut console = RttConsole::new();

        if maintenance.dump {
            match logger.dump_all(&mut console) {
                Ok(n) => info!("Dumped {} log files", n),
                Err(e) => warn!("Dump failed: {}", e),
            }
        }
        if maintenance.clear {
            match logger.clear_all() {
                Ok(n) => info!("Removed {} files", n),
                Err(e) => warn!("Clear failed: {}", e),
            }
        }

        info!("Card contents:");
        if let Err(e) = logger.list_root(&mut console) {
            warn!("Listing failed: {}", e);
        }
        let _ = console.flush();
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        info!("Idle task started - entering WFI loop");
        loop {
            cortex_m::asm::wfi();
        }
    }
}
